//! Structural validation for workflow definitions.
//!
//! These checks run before any request is dispatched so a malformed suite
//! fails fast instead of producing half a report.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::{SuiteDefinition, WorkflowDefinition};

/// Reasons a workflow definition cannot be executed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowValidationError {
    #[error("suite does not declare any workflows")]
    EmptySuite,

    #[error("workflow '{workflow}' does not declare any steps")]
    NoSteps { workflow: String },

    #[error("workflow '{workflow}' step {step} has an empty url")]
    EmptyUrl { workflow: String, step: usize },

    #[error("workflow '{workflow}' step {step} has a context update with an empty key")]
    EmptyContextKey { workflow: String, step: usize },

    #[error("workflow '{workflow}' step {step} context key '{key}' may only contain letters, digits, '_', '-' or '.'")]
    InvalidContextKey { workflow: String, step: usize, key: String },

    #[error("initial context key '{key}' may only contain letters, digits, '_', '-' or '.'")]
    InvalidInitialContextKey { key: String },

    #[error("workflow '{workflow}' step {step} context update '{key}' has an empty path")]
    EmptyContextPath { workflow: String, step: usize, key: String },

    #[error("workflow '{workflow}' step {step} has an empty header name")]
    EmptyHeaderName { workflow: String, step: usize },

    #[error("workflow '{workflow}' step {step} has a zero-second timeout")]
    ZeroTimeout { workflow: String, step: usize },
}

/// True when `candidate` can appear as a `{name}` placeholder: ASCII letters,
/// digits, `_`, `-` and `.` only.
pub fn is_context_key(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .chars()
            .all(|character| character.is_ascii_alphanumeric() || matches!(character, '_' | '-' | '.'))
}

/// Validate a single workflow. Step numbers in errors are 1-indexed.
pub fn validate_workflow(workflow: &WorkflowDefinition) -> Result<(), WorkflowValidationError> {
    let name = workflow.workflow.clone();
    if workflow.steps.is_empty() {
        return Err(WorkflowValidationError::NoSteps { workflow: name });
    }

    for (index, step) in workflow.steps.iter().enumerate() {
        let step_number = index + 1;
        if step.url.trim().is_empty() {
            return Err(WorkflowValidationError::EmptyUrl {
                workflow: name,
                step: step_number,
            });
        }
        if step.headers.keys().any(|header| header.trim().is_empty()) {
            return Err(WorkflowValidationError::EmptyHeaderName {
                workflow: name,
                step: step_number,
            });
        }
        if step.timeout_seconds == Some(0) {
            return Err(WorkflowValidationError::ZeroTimeout {
                workflow: name,
                step: step_number,
            });
        }
        for update in &step.context_updates {
            if update.key.trim().is_empty() {
                return Err(WorkflowValidationError::EmptyContextKey {
                    workflow: name,
                    step: step_number,
                });
            }
            if !is_context_key(&update.key) {
                return Err(WorkflowValidationError::InvalidContextKey {
                    workflow: name,
                    step: step_number,
                    key: update.key.clone(),
                });
            }
            if update.path.trim().is_empty() {
                return Err(WorkflowValidationError::EmptyContextPath {
                    workflow: name,
                    step: step_number,
                    key: update.key.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Reject initial context keys that no `{name}` placeholder could reference.
pub fn validate_context_keys(context: &IndexMap<String, JsonValue>) -> Result<(), WorkflowValidationError> {
    match context.keys().find(|key| !is_context_key(key)) {
        Some(key) => Err(WorkflowValidationError::InvalidInitialContextKey { key: key.clone() }),
        None => Ok(()),
    }
}

/// Validate every workflow in a suite, stopping at the first problem.
pub fn validate_suite(suite: &SuiteDefinition) -> Result<(), WorkflowValidationError> {
    if suite.workflows.is_empty() {
        return Err(WorkflowValidationError::EmptySuite);
    }
    validate_context_keys(&suite.context)?;
    suite.workflows.values().try_for_each(validate_workflow)
}
