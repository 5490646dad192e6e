//! Execution engine: compiles a workflow into a plan, renders each step against
//! the run context, and turns one HTTP exchange into one [`StepResult`].
//!
//! - Plan preparation validates the workflow and tokenizes every template once
//! - Rendering substitutes context values into URL, headers and body
//! - [`run_step`] performs a single request attempt and classifies the outcome

use std::time::{Duration, Instant};

use dashprobe_api::{HttpRequest, HttpTransport, TransportError};
use dashprobe_types::{StepDefinition, StepResult, StepStatus, WorkflowDefinition, WorkflowValidationError, validate_workflow};
use dashprobe_util::{has_clean_url, http::serialized_size, redact_sensitive};
use indexmap::IndexMap;
use tracing::{info, warn};

use crate::{
    resolve::RunContext,
    templates::{BodyTemplate, Template, merge_unresolved},
};

/// Default request timeout when neither the runner nor the step sets one.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(30);

/// A workflow step with its templates tokenized.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedStep {
    /// 1-indexed position in the workflow.
    pub number: usize,
    pub definition: StepDefinition,
    pub url: Template,
    pub headers: Vec<(String, Template)>,
    pub body: Option<BodyTemplate>,
}

impl PreparedStep {
    pub fn compile(number: usize, definition: &StepDefinition) -> Self {
        Self {
            number,
            definition: definition.clone(),
            url: Template::parse(&definition.url),
            headers: definition
                .headers
                .iter()
                .map(|(name, value)| (name.clone(), Template::parse(value)))
                .collect(),
            body: definition.body.as_ref().map(BodyTemplate::compile),
        }
    }

    /// Substitute the current context into this step.
    pub fn render(&self, context: &RunContext, default_timeout: Duration) -> RenderedStep {
        let url = self.url.render(context);
        let mut unresolved = url.unresolved;

        let mut headers = IndexMap::with_capacity(self.headers.len());
        for (name, template) in &self.headers {
            let rendered = template.render(context);
            merge_unresolved(&mut unresolved, rendered.unresolved);
            headers.insert(name.clone(), rendered.value);
        }

        let body = self.body.as_ref().map(|template| {
            let rendered = template.render(context);
            merge_unresolved(&mut unresolved, rendered.unresolved);
            rendered.value
        });

        let timeout = self.definition.timeout_seconds.map(Duration::from_secs).unwrap_or(default_timeout);

        RenderedStep {
            description: self.definition.description.clone(),
            critical: self.definition.critical,
            requires_auth: self.definition.requires_auth,
            request: HttpRequest {
                method: self.definition.method,
                url: url.value,
                headers,
                body,
                timeout,
            },
            unresolved_placeholders: unresolved,
        }
    }
}

/// A step after placeholder substitution, ready to dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedStep {
    pub description: String,
    pub critical: bool,
    pub requires_auth: bool,
    pub request: HttpRequest,
    pub unresolved_placeholders: Vec<String>,
}

/// A validated workflow with every step compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub name: String,
    pub steps: Vec<PreparedStep>,
}

/// Validate `workflow` and tokenize its templates.
pub fn prepare_plan(workflow: &WorkflowDefinition) -> Result<Plan, WorkflowValidationError> {
    validate_workflow(workflow)?;
    let steps = workflow
        .steps
        .iter()
        .enumerate()
        .map(|(index, step)| PreparedStep::compile(index + 1, step))
        .collect();
    Ok(Plan {
        name: workflow.workflow.clone(),
        steps,
    })
}

/// Classify a failed request.
///
/// 403 always, and 401 on a step that requires auth, are expected auth
/// errors; everything else, including transport failures without a status
/// code, is a failure.
pub fn classify_failure(status_code: Option<u16>, requires_auth: bool) -> StepStatus {
    match status_code {
        Some(403) => StepStatus::PassExpectedAuth,
        Some(401) if requires_auth => StepStatus::PassExpectedAuth,
        _ => StepStatus::Fail,
    }
}

/// Perform one request for `step` and record the outcome.
///
/// Exactly one attempt is made. Errors never propagate: they are captured in
/// the returned result.
pub fn run_step(transport: &dyn HttpTransport, step: &RenderedStep) -> StepResult {
    let request = &step.request;
    let start = Instant::now();
    let outcome = transport.send(request);
    let response_time_ms = start.elapsed().as_millis() as u64;
    let has_clean_url = has_clean_url(&request.url);

    let result = match outcome {
        Ok(response) => StepResult {
            description: step.description.clone(),
            url: request.url.clone(),
            method: request.method,
            status: StepStatus::Pass,
            http_status_code: Some(response.status),
            response_time_ms,
            response_size_bytes: serialized_size(&response.body),
            error: None,
            raw_response: Some(response.body),
            has_clean_url,
            unresolved_placeholders: step.unresolved_placeholders.clone(),
            critical: step.critical,
        },
        Err(error) => failure_result(step, error, response_time_ms, has_clean_url),
    };

    log_step_outcome(&result);
    result
}

/// A step that was never dispatched because strict placeholder checking rejected it.
pub fn unresolved_step_result(step: &RenderedStep) -> StepResult {
    let result = StepResult {
        description: step.description.clone(),
        url: step.request.url.clone(),
        method: step.request.method,
        status: StepStatus::Fail,
        http_status_code: None,
        response_time_ms: 0,
        response_size_bytes: 0,
        error: Some(format!("unresolved placeholders: {}", step.unresolved_placeholders.join(", "))),
        raw_response: None,
        has_clean_url: has_clean_url(&step.request.url),
        unresolved_placeholders: step.unresolved_placeholders.clone(),
        critical: step.critical,
    };
    log_step_outcome(&result);
    result
}

fn failure_result(step: &RenderedStep, error: TransportError, response_time_ms: u64, has_clean_url: bool) -> StepResult {
    let status_code = error.status_code();
    let status = classify_failure(status_code, step.requires_auth);
    let raw_response = error.body().cloned();
    let response_size_bytes = raw_response.as_ref().map(serialized_size).unwrap_or(0);

    StepResult {
        description: step.description.clone(),
        url: step.request.url.clone(),
        method: step.request.method,
        status,
        http_status_code: status_code,
        response_time_ms,
        response_size_bytes,
        error: Some(redact_sensitive(&error.to_string())),
        raw_response,
        has_clean_url,
        unresolved_placeholders: step.unresolved_placeholders.clone(),
        critical: step.critical,
    }
}

fn log_step_outcome(result: &StepResult) {
    let url = redact_sensitive(&result.url);
    match result.status {
        StepStatus::Fail => warn!(
            step = %result.description,
            method = %result.method,
            url = %url,
            status_code = ?result.http_status_code,
            response_time_ms = result.response_time_ms,
            error = result.error.as_deref().unwrap_or_default(),
            critical = result.critical,
            "step failed"
        ),
        status => info!(
            step = %result.description,
            method = %result.method,
            url = %url,
            status_code = ?result.http_status_code,
            response_time_ms = result.response_time_ms,
            outcome = status.label(),
            "step passed"
        ),
    }
}
