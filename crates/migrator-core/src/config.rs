//! Run configuration: defaults, environment overrides, and the pieces
//! derived from them

use crate::input::{NonInteractiveInput, SelectionPreference, UserInput};
use crate::steps::TemplateInserterOptions;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable listing template configuration files
/// (platform path-list separated)
pub const TEMPLATE_CONFIGS_ENV: &str = "MIGRATOR_TEMPLATE_CONFIGS";

/// Environment variable overriding the non-interactive pause, in seconds
pub const NON_INTERACTIVE_WAIT_ENV: &str = "MIGRATOR_NON_INTERACTIVE_WAIT";

/// Template configuration used when nothing else is specified
pub const DEFAULT_TEMPLATE_CONFIG: &str = "templates/TemplateConfig.json";

const DEFAULT_NON_INTERACTIVE_WAIT: Duration = Duration::from_secs(2);

/// Everything needed to run a migration over one project
#[derive(Debug, Clone)]
pub struct MigratorConfig {
    /// Project manifest to migrate
    pub project_path: PathBuf,

    /// Template configuration files, later ones overriding earlier ones
    pub template_config_files: Vec<PathBuf>,

    /// Directory relative template configuration paths are resolved against
    pub base_dir: PathBuf,

    /// Answer prompts automatically instead of asking
    pub non_interactive: bool,

    /// Pause before proceeding in non-interactive mode
    pub non_interactive_wait: Duration,

    /// Step ids for which non-interactive mode picks the last enabled
    /// command instead of the first
    pub last_choice_steps: Vec<String>,
}

impl MigratorConfig {
    /// Defaults for migrating `project_path`
    pub fn new(project_path: impl Into<PathBuf>) -> Self {
        Self {
            project_path: project_path.into(),
            template_config_files: vec![PathBuf::from(DEFAULT_TEMPLATE_CONFIG)],
            base_dir: default_base_dir(),
            non_interactive: false,
            non_interactive_wait: DEFAULT_NON_INTERACTIVE_WAIT,
            last_choice_steps: Vec::new(),
        }
    }

    /// Defaults overridden from the process environment
    pub fn from_env(project_path: impl Into<PathBuf>) -> Self {
        let mut config = Self::new(project_path);
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(paths) = lookup(TEMPLATE_CONFIGS_ENV) {
            let files: Vec<PathBuf> = std::env::split_paths(&paths)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            if !files.is_empty() {
                self.template_config_files = files;
            }
        }

        if let Some(wait) = lookup(NON_INTERACTIVE_WAIT_ENV) {
            match wait.trim().parse::<u64>() {
                Ok(secs) => self.non_interactive_wait = Duration::from_secs(secs),
                Err(_) => tracing::warn!(
                    "Ignoring invalid {} value: {}",
                    NON_INTERACTIVE_WAIT_ENV,
                    wait
                ),
            }
        }
    }

    pub fn template_inserter_options(&self) -> TemplateInserterOptions {
        TemplateInserterOptions {
            template_config_files: self.template_config_files.clone(),
            base_dir: self.base_dir.clone(),
        }
    }

    /// Non-interactive input carrying this configuration's preferences
    pub fn non_interactive_input(&self) -> NonInteractiveInput {
        self.last_choice_steps.iter().fold(
            NonInteractiveInput::new(self.non_interactive_wait),
            |input, step| input.with_preference(step.clone(), SelectionPreference::Last),
        )
    }

    /// Prompt source for this run
    pub fn user_input(&self) -> Box<dyn UserInput> {
        if !self.non_interactive {
            if let Some(input) = console_input() {
                return input;
            }
            tracing::warn!("Interactive prompts unavailable; answering non-interactively");
        }

        Box::new(self.non_interactive_input())
    }
}

#[cfg(feature = "tui")]
fn console_input() -> Option<Box<dyn UserInput>> {
    Some(Box::new(crate::input::ConsoleInput))
}

#[cfg(not(feature = "tui"))]
fn console_input() -> Option<Box<dyn UserInput>> {
    None
}

/// Directory holding the running executable, falling back to the current
/// directory
pub fn default_base_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}
