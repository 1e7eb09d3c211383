//! Typed failures surfaced by migration steps and their collaborators

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can stop a migration step
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The project manifest does not exist on disk
    #[error("Project file {} not found", .0.display())]
    ProjectNotFound(PathBuf),

    /// The project manifest exists but could not be parsed
    #[error("Invalid project: {}", path.display())]
    InvalidProject {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Writing the project manifest back to disk failed
    #[error("Failed to save project {}", path.display())]
    SaveProject {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A template source could not be opened
    #[error("Template file not found: {}", path.display())]
    TemplateSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A template could not be written into the project
    #[error("Failed to write {}", path.display())]
    Materialize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An existing file could not be moved out of the way
    #[error("Failed to move {} to {}", from.display(), to.display())]
    Backup {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The operation was cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,

    /// A prompt was offered with nothing selectable
    #[error("No enabled commands to choose from")]
    NoEnabledCommand,

    /// Interactive prompt failed for a reason other than cancellation
    #[error("Prompt failed: {0}")]
    Prompt(#[source] std::io::Error),
}

/// Result alias used across the core crate
pub type Result<T> = std::result::Result<T, MigrationError>;
