//! The two-phase contract every migration step honors
//!
//! A step is first asked to [`initialize`](MigrationStep::initialize): it
//! inspects the project, without changing anything, and reports whether work
//! remains. Only when it reports [`StepStatus::Incomplete`] does the driver
//! call [`apply`](MigrationStep::apply). Running `initialize` again after a
//! successful `apply` reports [`StepStatus::Complete`].

use crate::cancel::CancellationToken;
use crate::context::MigrationContext;
use crate::error::MigrationError;
use crate::input::{StepCommand, UserInput};
use async_trait::async_trait;
use std::fmt;

/// Where a step stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepStatus {
    /// Work remains; `apply` should run
    Incomplete,
    /// Nothing to do, or the work is already done
    Complete,
    /// The step cannot proceed; the pipeline must stop here
    Failed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepStatus::Incomplete => "Incomplete",
            StepStatus::Complete => "Complete",
            StepStatus::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// Status plus a one-line, human-readable explanation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub status: StepStatus,
    pub details: String,
}

impl StepResult {
    pub fn new(status: StepStatus, details: impl Into<String>) -> Self {
        Self {
            status,
            details: details.into(),
        }
    }

    pub fn incomplete(details: impl Into<String>) -> Self {
        Self::new(StepStatus::Incomplete, details)
    }

    pub fn complete(details: impl Into<String>) -> Self {
        Self::new(StepStatus::Complete, details)
    }

    pub fn failed(details: impl Into<String>) -> Self {
        Self::new(StepStatus::Failed, details)
    }

    /// Log a fatal error and turn it into a `Failed` result
    pub fn from_error(err: &MigrationError) -> Self {
        tracing::error!("{}", err);
        Self::failed(err.to_string())
    }
}

/// One unit of a migration pipeline
#[async_trait]
pub trait MigrationStep: Send + Sync {
    /// Stable identifier, used to look up per-step preferences
    fn id(&self) -> &str;

    fn title(&self) -> &str;

    fn description(&self) -> &str;

    /// Decide whether this step has work to do. Must not modify the project.
    async fn initialize(
        &mut self,
        context: &dyn MigrationContext,
        cancel: &CancellationToken,
    ) -> StepResult;

    /// Do the work found by the preceding `initialize`
    async fn apply(
        &mut self,
        context: &dyn MigrationContext,
        cancel: &CancellationToken,
    ) -> StepResult;
}

const APPLY_COMMAND: usize = 0;

/// Run one step to completion.
///
/// Initializes the step and, when work remains, asks `input` whether to
/// apply it. After applying, the step is initialized again so the returned
/// result reflects the project as it now stands.
pub async fn run_step(
    step: &mut dyn MigrationStep,
    context: &dyn MigrationContext,
    input: &dyn UserInput,
    cancel: &CancellationToken,
) -> StepResult {
    tracing::info!("Initializing step: {}", step.title());
    let initial = step.initialize(context, cancel).await;
    tracing::info!("{} [{}]: {}", step.title(), initial.status, initial.details);

    if initial.status != StepStatus::Incomplete {
        return initial;
    }

    let commands = [
        StepCommand::new(format!("Apply: {}", step.title()), true),
        StepCommand::new("Skip", true),
    ];
    let prompt = format!("{}\n{}", step.description(), initial.details);
    let choice = match input.choose(&prompt, &commands, Some(step.id()), cancel).await {
        Ok(choice) => choice,
        Err(e) => return StepResult::from_error(&e),
    };

    if choice != APPLY_COMMAND {
        tracing::info!("Skipped step: {}", step.title());
        return initial;
    }

    let applied = step.apply(context, cancel).await;
    if applied.status == StepStatus::Failed {
        return applied;
    }
    tracing::info!("{}", applied.details);

    step.initialize(context, cancel).await
}
