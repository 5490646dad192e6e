//! Outcome types produced by a workflow run.
//!
//! Results are created once and never mutated; aggregates are derived from the
//! step list so counts cannot drift from what was actually recorded.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::workflow::HttpMethod;

/// Classification of a single step outcome.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StepStatus {
    /// The request completed with a success response.
    #[serde(rename = "PASS")]
    Pass,
    /// The request was rejected with 403, or 401 on a step that requires auth.
    #[serde(rename = "PASS (expected auth error)")]
    PassExpectedAuth,
    /// Any other error response, transport failure or timeout.
    #[serde(rename = "FAIL")]
    Fail,
}

impl StepStatus {
    /// True for both pass variants.
    pub fn is_pass(&self) -> bool {
        !matches!(self, StepStatus::Fail)
    }

    /// Report label.
    pub fn label(&self) -> &'static str {
        match self {
            StepStatus::Pass => "PASS",
            StepStatus::PassExpectedAuth => "PASS (expected auth error)",
            StepStatus::Fail => "FAIL",
        }
    }
}

/// Result of running one workflow step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub description: String,
    /// URL after placeholder substitution.
    pub url: String,
    pub method: HttpMethod,
    pub status: StepStatus,
    pub http_status_code: Option<u16>,
    pub response_time_ms: u64,
    /// Byte length of the JSON-serialized response body.
    pub response_size_bytes: usize,
    pub error: Option<String>,
    pub raw_response: Option<JsonValue>,
    /// False when the URL path carries a deployment-stage segment.
    pub has_clean_url: bool,
    /// Placeholders left verbatim because the context had no value for them.
    #[serde(default)]
    pub unresolved_placeholders: Vec<String>,
    #[serde(default)]
    pub critical: bool,
}

impl StepResult {
    /// A hard error is a genuine failure, as opposed to an expected auth rejection.
    pub fn is_hard_error(&self) -> bool {
        self.status == StepStatus::Fail
    }
}

/// Terminal status of a workflow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkflowStatus {
    Pass,
    Partial,
}

/// Aggregate outcome of one workflow execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowResult {
    pub name: String,
    pub status: WorkflowStatus,
    /// Steps declared by the workflow definition.
    pub declared_steps: usize,
    /// Steps actually attempted; lower than `declared_steps` after a critical abort.
    pub total_steps: usize,
    pub passed_steps: usize,
    pub failed_steps: usize,
    /// Declared steps never attempted.
    pub skipped_steps: usize,
    pub hard_errors: usize,
    /// 1-indexed step whose critical failure ended the workflow.
    pub aborted_at_step: Option<usize>,
    pub elapsed_ms: u64,
    pub steps: Vec<StepResult>,
    /// Context as it stood when the workflow finished.
    pub context: IndexMap<String, JsonValue>,
}

impl WorkflowResult {
    /// Build the aggregate from the recorded step results.
    pub fn from_steps(
        name: impl Into<String>,
        declared_steps: usize,
        steps: Vec<StepResult>,
        elapsed_ms: u64,
        context: IndexMap<String, JsonValue>,
        aborted_at_step: Option<usize>,
    ) -> Self {
        let total_steps = steps.len();
        let passed_steps = steps.iter().filter(|step| step.status.is_pass()).count();
        let failed_steps = total_steps - passed_steps;
        let hard_errors = steps.iter().filter(|step| step.is_hard_error()).count();
        let status = if passed_steps == total_steps {
            WorkflowStatus::Pass
        } else {
            WorkflowStatus::Partial
        };

        Self {
            name: name.into(),
            status,
            declared_steps,
            total_steps,
            passed_steps,
            failed_steps,
            skipped_steps: declared_steps.saturating_sub(total_steps),
            hard_errors,
            aborted_at_step,
            elapsed_ms,
            steps,
            context,
        }
    }
}
