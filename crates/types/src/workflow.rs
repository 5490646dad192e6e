//! Strongly typed workflow definitions shared across the engine and CLI.
//!
//! Suites preserve authoring order (via `IndexMap`) so workflows run, and are
//! reported, in the order they were written.

use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub mod validation;

/// HTTP methods a workflow step may issue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
}

impl HttpMethod {
    /// Upper-case wire representation (for example `GET`).
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            other => Err(format!("unsupported HTTP method '{other}'")),
        }
    }
}

/// Copies a response field into the run context once a step passes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextUpdate {
    /// Context variable written by this update.
    pub key: String,
    /// Dotted path into the response body (for example `data.discoveryId`).
    pub path: String,
}

/// A single HTTP request within a workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StepDefinition {
    /// Human-readable label shown in reports.
    #[serde(default)]
    pub description: String,
    /// HTTP method; defaults to `GET`.
    #[serde(default)]
    pub method: HttpMethod,
    /// URL template; `{key}` placeholders are filled from the run context.
    pub url: String,
    /// Request headers, sent in authoring order.
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    /// Optional JSON body; string leaves and keys may contain placeholders.
    #[serde(default)]
    pub body: Option<JsonValue>,
    /// When true, a 401 response counts as an expected auth error.
    #[serde(default)]
    pub requires_auth: bool,
    /// When true, a failure stops the remaining steps of the workflow.
    #[serde(default)]
    pub critical: bool,
    /// Response fields captured into the run context after a pass.
    #[serde(default)]
    pub context_updates: Vec<ContextUpdate>,
    /// Per-step timeout override in seconds.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

/// An ordered sequence of steps sharing one run context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct WorkflowDefinition {
    /// Workflow identifier; filled from the suite key when omitted.
    #[serde(default)]
    pub workflow: String,
    /// Optional descriptive copy for reports.
    #[serde(default)]
    pub description: Option<String>,
    /// Steps executed strictly in order.
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

/// A named, ordered collection of workflows plus the values every run starts with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SuiteDefinition {
    /// Initial context values seeded into every workflow run.
    #[serde(default)]
    pub context: IndexMap<String, JsonValue>,
    /// Workflows keyed by name, in authoring order.
    #[serde(default)]
    pub workflows: IndexMap<String, WorkflowDefinition>,
}

impl SuiteDefinition {
    /// Ensures every workflow carries its identifier, using the map key as fallback.
    pub fn normalize_names(&mut self) {
        for (name, workflow) in self.workflows.iter_mut() {
            if workflow.workflow.trim().is_empty() {
                workflow.workflow = name.clone();
            }
        }
    }
}
