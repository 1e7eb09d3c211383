//! What a step can ask of the pipeline driving it

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Pipeline state shared with every step
#[async_trait]
pub trait MigrationContext: Send + Sync {
    /// Path of the project manifest being migrated, if one is selected
    async fn project_path(&self) -> Option<PathBuf>;

    /// Signal that persisted project state changed and must be reloaded
    /// before anything inspects it again
    async fn reload_workspace(&self);
}

/// Context for migrating a single project file
#[derive(Debug, Default)]
pub struct ProjectContext {
    project_path: Option<PathBuf>,
    reloads: AtomicUsize,
}

impl ProjectContext {
    pub fn new(project_path: impl Into<PathBuf>) -> Self {
        Self {
            project_path: Some(project_path.into()),
            reloads: AtomicUsize::new(0),
        }
    }

    /// How many times a step has requested a reload
    pub fn reload_count(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MigrationContext for ProjectContext {
    async fn project_path(&self) -> Option<PathBuf> {
        self.project_path.clone()
    }

    async fn reload_workspace(&self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Workspace reload requested");
    }
}
