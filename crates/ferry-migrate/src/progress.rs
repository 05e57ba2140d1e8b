//! Step tracking and progress reporting for a migration run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Callback invoked with a copy of a step every time it changes.
pub type ProgressCallback = Box<dyn Fn(MigrationStep) + Send + Sync>;

/// The phases of a migration, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Look the source repository up.
    ValidateSource,
    /// Create the target repository.
    CreateTarget,
    /// Clone all branches and tags into memory.
    CloneSource,
    /// Push all branches and tags to the target.
    PushTarget,
    /// Grant teams access.
    ConfigureTeams,
    /// Register the webhook.
    ConfigureWebhook,
    /// Notify the downstream pipeline.
    TriggerPipeline,
}

impl StepKind {
    /// Steps of a run, in order. The pipeline step is last and only present
    /// when requested.
    pub fn plan(trigger_pipeline: bool) -> Vec<StepKind> {
        let mut steps = vec![
            Self::ValidateSource,
            Self::CreateTarget,
            Self::CloneSource,
            Self::PushTarget,
            Self::ConfigureTeams,
            Self::ConfigureWebhook,
        ];
        if trigger_pipeline {
            steps.push(Self::TriggerPipeline);
        }
        steps
    }

    /// Human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::ValidateSource => "Validate source repository",
            Self::CreateTarget => "Create target repository",
            Self::CloneSource => "Clone source repository",
            Self::PushTarget => "Push to target repository",
            Self::ConfigureTeams => "Configure team access",
            Self::ConfigureWebhook => "Configure webhook",
            Self::TriggerPipeline => "Trigger pipeline",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Status of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Not started.
    Pending,
    /// In progress.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
}

impl StepStatus {
    /// Completed or failed; a terminal step never changes again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One tracked step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStep {
    /// Which step this is.
    pub kind: StepKind,
    /// Human-readable description.
    pub description: String,
    /// Current status.
    pub status: StepStatus,
    /// Percentage, 0 to 100.
    pub progress: u8,
    /// Outcome or error message.
    pub message: String,
}

impl MigrationStep {
    /// A pending step.
    pub fn new(kind: StepKind) -> Self {
        Self {
            kind,
            description: kind.description().to_string(),
            status: StepStatus::Pending,
            progress: 0,
            message: String::new(),
        }
    }
}

/// Owns the step list of one run and reports every change.
///
/// The callback runs synchronously on the caller's task; a slow callback
/// delays the next step.
pub struct StepTracker {
    steps: Vec<MigrationStep>,
    callback: Option<ProgressCallback>,
}

impl StepTracker {
    /// Create a tracker with every step pending.
    pub fn new(kinds: &[StepKind], callback: Option<ProgressCallback>) -> Self {
        Self {
            steps: kinds.iter().copied().map(MigrationStep::new).collect(),
            callback,
        }
    }

    /// Set a step's status, progress and message, then notify the callback.
    ///
    /// Unknown kinds are ignored.
    pub fn update_step(
        &mut self,
        kind: StepKind,
        status: StepStatus,
        progress: u8,
        message: impl Into<String>,
    ) {
        let Some(step) = self.steps.iter_mut().find(|s| s.kind == kind) else {
            return;
        };
        step.status = status;
        step.progress = progress.min(100);
        step.message = message.into();

        if let Some(callback) = &self.callback {
            callback(step.clone());
        }
    }

    /// Mark a step running at 0%.
    pub fn start(&mut self, kind: StepKind) {
        self.update_step(kind, StepStatus::Running, 0, "In progress");
    }

    /// Mark a step completed at 100%.
    pub fn complete(&mut self, kind: StepKind, message: impl Into<String>) {
        self.update_step(kind, StepStatus::Completed, 100, message);
    }

    /// Mark a step failed, leaving its progress where it was.
    pub fn fail(&mut self, kind: StepKind, message: impl Into<String>) {
        let progress = self.step(kind).map(|s| s.progress).unwrap_or(0);
        self.update_step(kind, StepStatus::Failed, progress, message);
    }

    /// All steps in order.
    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    /// A step by kind.
    pub fn step(&self, kind: StepKind) -> Option<&MigrationStep> {
        self.steps.iter().find(|s| s.kind == kind)
    }

    /// Number of steps currently running.
    pub fn running_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Running)
            .count()
    }

    /// The first failed step.
    pub fn failed_step(&self) -> Option<&MigrationStep> {
        self.steps.iter().find(|s| s.status == StepStatus::Failed)
    }

    /// Consume the tracker, returning the steps.
    pub fn into_steps(self) -> Vec<MigrationStep> {
        self.steps
    }
}

impl fmt::Debug for StepTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepTracker")
            .field("steps", &self.steps)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}
