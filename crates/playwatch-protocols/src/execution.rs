//! Execution snapshots pushed by the server for a playbook run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ExecutionId;

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;

/// Key inside [`StepResult::output`] holding the step's free-form text output.
pub const OUTPUT_TEXT_KEY: &str = "_output";

/// Overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    /// Terminal statuses are sticky: nothing follows them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Paused => "paused",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Status of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Result of one step, in step order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    pub step_name: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub output: Map<String, Value>,
}

impl StepResult {
    /// The distinguished `_output` text, when the step produced one.
    pub fn output_text(&self) -> Option<&str> {
        self.output.get(OUTPUT_TEXT_KEY).and_then(Value::as_str)
    }
}

/// Authoritative state of a run at the instant the server produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSnapshot {
    pub execution_id: ExecutionId,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub current_step_index: u32,
    #[serde(default)]
    pub total_steps: u32,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub step_results: Vec<StepResult>,
}

impl ExecutionSnapshot {
    /// Create a snapshot with no timing or step data.
    pub fn new(execution_id: impl Into<String>, status: ExecutionStatus) -> Self {
        Self {
            execution_id: execution_id.into(),
            status,
            current_step_index: 0,
            total_steps: 0,
            started_at: None,
            completed_at: None,
            error: None,
            step_results: Vec::new(),
        }
    }

    /// Set step progress.
    pub fn with_progress(mut self, current_step_index: u32, total_steps: u32) -> Self {
        self.current_step_index = current_step_index;
        self.total_steps = total_steps;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Fraction of steps reached, in `0.0..=1.0`.
    ///
    /// A terminal run with zero declared steps counts as fully progressed.
    pub fn progress(&self) -> f64 {
        if self.total_steps == 0 {
            return if self.is_terminal() { 1.0 } else { 0.0 };
        }
        (self.current_step_index as f64 / self.total_steps as f64).clamp(0.0, 1.0)
    }

    /// The step currently being executed, if the server reported it.
    pub fn current_step(&self) -> Option<&StepResult> {
        self.step_results.get(self.current_step_index as usize)
    }
}
