//! Shared type definitions for dashprobe.
//!
//! Workflow definitions describe what to send; result types describe what came
//! back. Both are plain serde types so suites can be authored in YAML/JSON and
//! results can be persisted as JSON without translation layers.

pub mod result;
pub mod workflow;

pub use result::{StepResult, StepStatus, WorkflowResult, WorkflowStatus};
pub use workflow::{
    ContextUpdate, HttpMethod, StepDefinition, SuiteDefinition, WorkflowDefinition,
    validation::{WorkflowValidationError, is_context_key, validate_context_keys, validate_suite, validate_workflow},
};
