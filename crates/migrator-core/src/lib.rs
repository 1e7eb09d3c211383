//! Migrator Core - staged, in-place project migration
//!
//! A migration is a sequence of steps. Every step honors the same two-phase
//! contract ([`MigrationStep`]): `initialize` inspects the project and reports
//! whether work remains, `apply` performs the work. Both phases are safe to
//! repeat; once a step has been applied, initializing it again reports
//! [`StepStatus::Complete`].
//!
//! # Architecture
//!
//! - **Step contract** - [`step`], [`context`], [`cancel`]
//! - **Project access** - [`project`]: load, query, edit and save a manifest
//! - **Templates** - [`templates`]: catalogs, matching, token resolution,
//!   streaming substitution and materialization with backups
//! - **Steps** - [`steps`]: the template inserter
//! - **Driving** - [`config`], [`input`], [`run_step`]
//!
//! # Feature Flags
//!
//! - `tui` (default): Enables cliclack-based interactive prompts
//!
//! # Example Usage
//!
//! ```ignore
//! use migrator_core::{run_step, CancellationToken, MigratorConfig, ProjectContext};
//! use migrator_core::steps::TemplateInserterStep;
//!
//! let config = MigratorConfig::from_env("src/App.proj.yaml");
//! let context = ProjectContext::new(&config.project_path);
//! let mut step = TemplateInserterStep::new(&config.project_path, config.template_inserter_options());
//! let input = config.user_input();
//!
//! let result = run_step(&mut step, &context, input.as_ref(), &CancellationToken::new()).await;
//! ```

pub mod cancel;
pub mod config;
pub mod context;
pub mod error;
pub mod input;
pub mod project;
pub mod step;
pub mod steps;
pub mod templates;

// Re-export main types for convenience
pub use cancel::CancellationToken;
pub use config::MigratorConfig;
pub use context::{MigrationContext, ProjectContext};
pub use error::MigrationError;
pub use input::{NonInteractiveInput, SelectionPreference, StepCommand, UserInput};
pub use project::{ItemMatchCandidate, Project, ProjectItem};
pub use step::{run_step, MigrationStep, StepResult, StepStatus};
