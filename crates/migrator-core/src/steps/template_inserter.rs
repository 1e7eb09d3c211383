//! Adds boilerplate files from templates when a project lacks them

use crate::cancel::CancellationToken;
use crate::context::MigrationContext;
use crate::error::MigrationError;
use crate::project::Project;
use crate::step::{MigrationStep, StepResult};
use crate::templates::config::{load_one, resolve_config_paths, RuntimeItemSpec};
use crate::templates::materializer::materialize;
use crate::templates::matcher::{is_web_app, project_contains};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const TEMPLATE_INSERTER_STEP_ID: &str = "template-inserter";

/// Options for [`TemplateInserterStep`]
#[derive(Debug, Clone, Default)]
pub struct TemplateInserterOptions {
    /// Template configuration files, in override order (later wins)
    pub template_config_files: Vec<PathBuf>,

    /// Directory relative configuration paths are resolved against
    pub base_dir: PathBuf,
}

/// Migration step that adds files described by template configurations
/// when the project does not already contain an equivalent file
pub struct TemplateInserterStep {
    config_files: Vec<PathBuf>,
    items_to_add: IndexMap<String, RuntimeItemSpec>,
    description: String,
}

impl TemplateInserterStep {
    pub fn new(project_path: &Path, options: TemplateInserterOptions) -> Self {
        let config_files = resolve_config_paths(&options.template_config_files, &options.base_dir);

        if config_files.is_empty() {
            tracing::warn!(
                "No template configuration files provided; no template files will be added to project"
            );
        }

        let description = format!(
            "Add template files (for startup code paths, for example) to {} based on template files described in: {}",
            project_path.display(),
            config_files
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Self {
            config_files,
            items_to_add: IndexMap::new(),
            description,
        }
    }

    /// Items the last `initialize` found missing, keyed by destination path
    pub fn items_to_add(&self) -> &IndexMap<String, RuntimeItemSpec> {
        &self.items_to_add
    }

    async fn find_needed_items(
        &mut self,
        project: &Project,
        cancel: &CancellationToken,
    ) -> Result<(), MigrationError> {
        let web_app = is_web_app(project).await;

        // Later configuration files intentionally replace earlier files' items
        for config_file in &self.config_files {
            cancel.check()?;

            let base_path = config_file.parent().unwrap_or_else(|| Path::new(""));
            let config = match load_one(config_file).await {
                Some(config) if web_app || !config.update_web_apps_only => config,
                _ => {
                    tracing::debug!(
                        "Skipping inapplicable template config file {}",
                        config_file.display()
                    );
                    continue;
                }
            };

            tracing::debug!(
                "Loaded {} template items from template config file {}",
                config.template_items.len(),
                config_file.display()
            );

            for template_item in &config.template_items {
                if project_contains(project, template_item).await {
                    tracing::debug!(
                        "Not adding template item {} because the project already contains a similar item",
                        template_item.path
                    );
                    continue;
                }

                let template_path = base_path.join(&template_item.path);
                if !fs::try_exists(&template_path).await.unwrap_or(false) {
                    tracing::error!("Template file not found: {}", template_path.display());
                    continue;
                }

                tracing::debug!(
                    "Marking template item {} from template configuration {} for addition",
                    template_item.path,
                    config_file.display()
                );
                self.items_to_add.insert(
                    template_item.path.clone(),
                    RuntimeItemSpec::new(
                        template_item.clone(),
                        template_path,
                        config.replacements.clone(),
                    ),
                );
            }
        }

        Ok(())
    }

    fn needed_list(&self) -> String {
        self.items_to_add
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

async fn load_project(context: &dyn MigrationContext) -> Result<Project, MigrationError> {
    match context.project_path().await {
        Some(path) => Project::load(path).await,
        None => Err(MigrationError::ProjectNotFound(PathBuf::new())),
    }
}

#[async_trait]
impl MigrationStep for TemplateInserterStep {
    fn id(&self) -> &str {
        TEMPLATE_INSERTER_STEP_ID
    }

    fn title(&self) -> &str {
        "Add template files"
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn initialize(
        &mut self,
        context: &dyn MigrationContext,
        cancel: &CancellationToken,
    ) -> StepResult {
        self.items_to_add.clear();

        let project = match load_project(context).await {
            Ok(project) => project,
            Err(e) => return StepResult::from_error(&e),
        };

        if let Err(e) = self.find_needed_items(&project, cancel).await {
            self.items_to_add.clear();
            return StepResult::from_error(&e);
        }

        tracing::info!("{} expected template items needed", self.items_to_add.len());

        if self.items_to_add.is_empty() {
            return StepResult::complete("All expected template items found");
        }

        tracing::debug!("Needed items: {}", self.needed_list());
        StepResult::incomplete(format!(
            "{} expected template items needed ({})",
            self.items_to_add.len(),
            self.needed_list()
        ))
    }

    async fn apply(
        &mut self,
        context: &dyn MigrationContext,
        cancel: &CancellationToken,
    ) -> StepResult {
        // Needed items are consumed by this call whatever its outcome
        let items = std::mem::take(&mut self.items_to_add);

        let mut project = match load_project(context).await {
            Ok(project) => project,
            Err(e) => return StepResult::from_error(&e),
        };

        let added = match materialize(&items, &mut project, cancel).await {
            Ok(added) => added,
            Err(e) => {
                // Persist renames and registrations for files already moved
                // or written, so the manifest matches what is on disk
                if let Err(save_error) = project.save().await {
                    tracing::error!("{}", save_error);
                }
                context.reload_workspace().await;
                return StepResult::from_error(&e);
            }
        };

        if let Err(e) = project.save().await {
            return StepResult::from_error(&e);
        }

        // The project on disk may now differ from anything loaded earlier
        context.reload_workspace().await;

        tracing::info!("{} template items added", added);
        StepResult::complete(format!("{} template items added", added))
    }
}
