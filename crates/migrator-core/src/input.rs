//! Collecting decisions from the user, or standing in for them

use crate::cancel::CancellationToken;
use crate::error::{MigrationError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// One option offered to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepCommand {
    pub text: String,
    pub enabled: bool,
}

impl StepCommand {
    pub fn new(text: impl Into<String>, enabled: bool) -> Self {
        Self {
            text: text.into(),
            enabled,
        }
    }
}

/// Which enabled command a non-interactive run picks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionPreference {
    #[default]
    First,
    Last,
}

/// Source of user decisions during a migration
#[async_trait]
pub trait UserInput: Send + Sync {
    /// Choose one of `commands`, returning its index. Disabled commands are
    /// never returned.
    async fn choose(
        &self,
        message: &str,
        commands: &[StepCommand],
        step_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<usize>;

    /// Pause before continuing. `Ok(false)` means the user declined.
    async fn wait_to_proceed(&self, cancel: &CancellationToken) -> Result<bool>;
}

/// Answers prompts without a terminal
#[derive(Debug, Clone, Default)]
pub struct NonInteractiveInput {
    wait: Duration,
    preferences: HashMap<String, SelectionPreference>,
    default_preference: SelectionPreference,
}

impl NonInteractiveInput {
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            ..Self::default()
        }
    }

    /// Override the selection rule for one step
    pub fn with_preference(
        mut self,
        step_id: impl Into<String>,
        preference: SelectionPreference,
    ) -> Self {
        self.preferences.insert(step_id.into(), preference);
        self
    }

    /// Override the selection rule for every step without its own preference
    pub fn with_default_preference(mut self, preference: SelectionPreference) -> Self {
        self.default_preference = preference;
        self
    }

    fn preference_for(&self, step_id: Option<&str>) -> SelectionPreference {
        step_id
            .and_then(|id| self.preferences.get(id).copied())
            .unwrap_or(self.default_preference)
    }
}

#[async_trait]
impl UserInput for NonInteractiveInput {
    async fn choose(
        &self,
        message: &str,
        commands: &[StepCommand],
        step_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        cancel.check()?;

        let mut enabled = commands
            .iter()
            .enumerate()
            .filter(|(_, command)| command.enabled)
            .map(|(index, _)| index);

        let selected = match self.preference_for(step_id) {
            SelectionPreference::First => enabled.next(),
            SelectionPreference::Last => enabled.last(),
        }
        .ok_or(MigrationError::NoEnabledCommand)?;

        tracing::info!(
            "{} -> {} (non-interactive)",
            message,
            commands[selected].text
        );
        Ok(selected)
    }

    async fn wait_to_proceed(&self, cancel: &CancellationToken) -> Result<bool> {
        tokio::select! {
            _ = tokio::time::sleep(self.wait) => Ok(true),
            _ = cancel.cancelled() => Err(MigrationError::Cancelled),
        }
    }
}

/// Terminal prompts using cliclack
#[cfg(feature = "tui")]
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleInput;

#[cfg(feature = "tui")]
fn prompt_error(e: std::io::Error) -> MigrationError {
    if e.kind() == std::io::ErrorKind::Interrupted {
        MigrationError::Cancelled
    } else {
        MigrationError::Prompt(e)
    }
}

#[cfg(feature = "tui")]
#[async_trait]
impl UserInput for ConsoleInput {
    async fn choose(
        &self,
        message: &str,
        commands: &[StepCommand],
        _step_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        cancel.check()?;

        if !commands.iter().any(|c| c.enabled) {
            return Err(MigrationError::NoEnabledCommand);
        }

        let mut select = cliclack::select(message);
        for (index, command) in commands.iter().enumerate() {
            if command.enabled {
                select = select.item(index, &command.text, "");
            }
        }

        select.interact().map_err(prompt_error)
    }

    async fn wait_to_proceed(&self, cancel: &CancellationToken) -> Result<bool> {
        cancel.check()?;

        cliclack::confirm("Continue?")
            .initial_value(true)
            .interact()
            .map_err(prompt_error)
    }
}
