//! Sequential workflow runner.
//!
//! Steps run strictly in declared order because later steps read context
//! values written by earlier ones. A failed critical step ends its workflow;
//! sibling workflows in a suite are unaffected.

use std::time::{Duration, Instant};

use dashprobe_api::HttpTransport;
use dashprobe_types::{
    StepDefinition, StepResult, StepStatus, SuiteDefinition, WorkflowDefinition, WorkflowResult, WorkflowValidationError, validate_context_keys, validate_suite,
};
use dashprobe_util::walk_path_lenient;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    executor::{DEFAULT_STEP_TIMEOUT, Plan, RenderedStep, prepare_plan, run_step, unresolved_step_result},
    resolve::RunContext,
};

/// Knobs shared by every workflow a runner executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerOptions {
    /// Timeout for steps that do not set `timeout_seconds`.
    pub default_timeout: Duration,
    /// Fail steps that still contain placeholders instead of sending them.
    pub strict_placeholders: bool,
    /// Bearer token attached to `requires_auth` steps lacking an Authorization header.
    pub auth_token: Option<String>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_STEP_TIMEOUT,
            strict_placeholders: false,
            auth_token: None,
        }
    }
}

/// Executes workflows against an [`HttpTransport`].
pub struct WorkflowRunner<'a> {
    transport: &'a dyn HttpTransport,
    options: RunnerOptions,
}

impl<'a> WorkflowRunner<'a> {
    pub fn new(transport: &'a dyn HttpTransport, options: RunnerOptions) -> Self {
        Self { transport, options }
    }

    /// Run one workflow from its steps and an initial context.
    ///
    /// `total_steps` on the result counts attempted steps; steps left after a
    /// critical failure are reported through `skipped_steps`.
    pub fn run_workflow(
        &self,
        name: &str,
        steps: &[StepDefinition],
        initial_context: &IndexMap<String, Value>,
    ) -> Result<WorkflowResult, WorkflowValidationError> {
        let definition = WorkflowDefinition {
            workflow: name.to_string(),
            description: None,
            steps: steps.to_vec(),
        };
        validate_context_keys(initial_context)?;
        let plan = prepare_plan(&definition)?;
        Ok(self.execute_plan(&plan, RunContext::new(initial_context)))
    }

    /// Run every workflow of a suite in order, each with a fresh context seeded
    /// from the suite's initial values.
    ///
    /// The whole suite is validated before the first request is sent.
    pub fn run_suite(&self, suite: &SuiteDefinition) -> Result<Vec<WorkflowResult>, WorkflowValidationError> {
        validate_suite(suite)?;
        let plans = suite.workflows.values().map(prepare_plan).collect::<Result<Vec<_>, _>>()?;

        Ok(plans
            .iter()
            .map(|plan| self.execute_plan(plan, RunContext::new(&suite.context)))
            .collect())
    }

    /// Execute a prepared plan. Never fails: every problem becomes a step result.
    pub fn execute_plan(&self, plan: &Plan, mut context: RunContext) -> WorkflowResult {
        let start = Instant::now();
        let mut results: Vec<StepResult> = Vec::with_capacity(plan.steps.len());
        let mut aborted_at_step = None;

        info!(workflow = %plan.name, steps = plan.steps.len(), "workflow started");

        for step in &plan.steps {
            let mut rendered = step.render(&context, self.options.default_timeout);
            if !rendered.unresolved_placeholders.is_empty() {
                warn!(
                    workflow = %plan.name,
                    step = step.number,
                    placeholders = %rendered.unresolved_placeholders.join(", "),
                    "step has unresolved placeholders"
                );
            }
            self.attach_auth(&mut rendered);

            let result = if self.options.strict_placeholders && !rendered.unresolved_placeholders.is_empty() {
                unresolved_step_result(&rendered)
            } else {
                run_step(self.transport, &rendered)
            };

            if result.status == StepStatus::Pass {
                apply_context_updates(&plan.name, step.number, &step.definition, &result, &mut context);
            }

            let stop = step.definition.critical && result.status == StepStatus::Fail;
            results.push(result);
            if stop {
                warn!(workflow = %plan.name, step = step.number, "critical step failed; skipping remaining steps");
                aborted_at_step = Some(step.number);
                break;
            }
        }

        let workflow_result = WorkflowResult::from_steps(
            plan.name.clone(),
            plan.steps.len(),
            results,
            start.elapsed().as_millis() as u64,
            context.snapshot(),
            aborted_at_step,
        );
        info!(
            workflow = %workflow_result.name,
            passed = workflow_result.passed_steps,
            total = workflow_result.total_steps,
            hard_errors = workflow_result.hard_errors,
            elapsed_ms = workflow_result.elapsed_ms,
            "workflow finished"
        );
        workflow_result
    }

    fn attach_auth(&self, step: &mut RenderedStep) {
        let Some(token) = self.options.auth_token.as_deref() else {
            return;
        };
        if !step.requires_auth {
            return;
        }
        let has_authorization = step.request.headers.keys().any(|name| name.eq_ignore_ascii_case("authorization"));
        if !has_authorization {
            step.request.headers.insert("Authorization".to_string(), format!("Bearer {token}"));
        }
    }
}

/// Copy response fields into the context.
///
/// A missing field along the path stops the descent; the deepest value
/// reached is stored.
fn apply_context_updates(workflow: &str, step_number: usize, definition: &StepDefinition, result: &StepResult, context: &mut RunContext) {
    let Some(response) = result.raw_response.as_ref() else {
        return;
    };

    for update in &definition.context_updates {
        let lookup = walk_path_lenient(response, &update.path);
        if !lookup.is_complete() {
            warn!(
                workflow = %workflow,
                step = step_number,
                key = %update.key,
                path = %update.path,
                resolved = lookup.resolved_segments,
                missing = lookup.missing_segment.as_deref().unwrap_or_default(),
                "context update path not fully present in response; keeping deepest value"
            );
        }
        debug!(workflow = %workflow, step = step_number, key = %update.key, "context updated");
        context.set(update.key.clone(), lookup.value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashprobe_api::{HttpRequest, HttpResponse, TransportError};
    use dashprobe_types::{ContextUpdate, HttpMethod, WorkflowStatus};
    use serde_json::json;
    use std::cell::RefCell;

    /// Replays canned outcomes keyed by URL and records every request.
    #[derive(Default)]
    struct ScriptedTransport {
        routes: Vec<(String, Result<HttpResponse, TransportError>)>,
        seen: RefCell<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn route(mut self, url: &str, outcome: Result<HttpResponse, TransportError>) -> Self {
            self.routes.push((url.to_string(), outcome));
            self
        }

        fn urls(&self) -> Vec<String> {
            self.seen.borrow().iter().map(|request| request.url.clone()).collect()
        }
    }

    impl HttpTransport for ScriptedTransport {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.borrow_mut().push(request.clone());
            self.routes
                .iter()
                .find(|(url, _)| url == &request.url)
                .map(|(_, outcome)| outcome.clone())
                .unwrap_or(Err(TransportError::Network {
                    message: format!("no route for {}", request.url),
                }))
        }
    }

    fn ok(body: Value) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse { status: 200, body })
    }

    fn status(code: u16) -> Result<HttpResponse, TransportError> {
        Err(TransportError::Status {
            status: code,
            message: format!("HTTP {code}"),
            body: Value::Null,
        })
    }

    fn step(description: &str, url: &str) -> StepDefinition {
        StepDefinition {
            description: description.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    fn capture(key: &str, path: &str) -> Vec<ContextUpdate> {
        vec![ContextUpdate {
            key: key.into(),
            path: path.into(),
        }]
    }

    fn base_context() -> IndexMap<String, Value> {
        IndexMap::from([("base_url".to_string(), json!("https://api.example.com"))])
    }

    #[test]
    fn context_propagates_between_steps() {
        let transport = ScriptedTransport::default()
            .route("https://api.example.com/api/discovery", ok(json!({ "discoveryId": "abc123" })))
            .route("https://api.example.com/api/discovery/abc123", ok(json!({ "state": "done" })));
        let steps = vec![
            StepDefinition {
                method: HttpMethod::Post,
                body: Some(json!({ "region": "us-east-1" })),
                context_updates: capture("discoveryId", "discoveryId"),
                ..step("start discovery", "{base_url}/api/discovery")
            },
            step("read discovery", "{base_url}/api/discovery/{discoveryId}"),
        ];

        let runner = WorkflowRunner::new(&transport, RunnerOptions::default());
        let result = runner.run_workflow("discovery", &steps, &base_context()).expect("valid workflow");

        assert_eq!(result.status, WorkflowStatus::Pass);
        assert_eq!(result.steps[1].url, "https://api.example.com/api/discovery/abc123");
        assert_eq!(result.context["discoveryId"], json!("abc123"));
        assert!(result.steps.iter().all(|step| step.unresolved_placeholders.is_empty()));
    }

    #[test]
    fn end_to_end_partial_with_critical_last_step() {
        let transport = ScriptedTransport::default()
            .route("https://api.example.com/instances", ok(json!({ "instanceId": "i-1" })))
            .route("https://api.example.com/instances/i-1", ok(json!({ "state": "running" })))
            .route("https://api.example.com/instances/i-1/restart", status(500));
        let steps = vec![
            StepDefinition {
                context_updates: capture("instanceId", "instanceId"),
                ..step("list", "{base_url}/instances")
            },
            step("read", "{base_url}/instances/{instanceId}"),
            StepDefinition {
                method: HttpMethod::Post,
                critical: true,
                ..step("restart", "{base_url}/instances/{instanceId}/restart")
            },
        ];

        let runner = WorkflowRunner::new(&transport, RunnerOptions::default());
        let result = runner.run_workflow("instances", &steps, &base_context()).expect("valid workflow");

        assert_eq!(result.steps[1].url, "https://api.example.com/instances/i-1");
        assert_eq!(result.status, WorkflowStatus::Partial);
        assert_eq!(result.total_steps, 3);
        assert_eq!(result.passed_steps, 2);
        assert_eq!(result.failed_steps, 1);
        assert_eq!(result.hard_errors, 1);
        assert_eq!(result.aborted_at_step, Some(3));
    }

    #[test]
    fn critical_failure_stops_remaining_steps() {
        let transport = ScriptedTransport::default()
            .route("https://api.example.com/a", ok(json!({})))
            .route("https://api.example.com/b", status(502))
            .route("https://api.example.com/c", ok(json!({})));
        let steps = vec![
            step("a", "{base_url}/a"),
            StepDefinition {
                critical: true,
                ..step("b", "{base_url}/b")
            },
            step("c", "{base_url}/c"),
            step("d", "{base_url}/c"),
        ];

        let runner = WorkflowRunner::new(&transport, RunnerOptions::default());
        let result = runner.run_workflow("abort", &steps, &base_context()).expect("valid workflow");

        assert_eq!(result.steps.len(), 2);
        assert_eq!(result.total_steps, 2);
        assert_eq!(result.declared_steps, 4);
        assert_eq!(result.skipped_steps, 2);
        assert_eq!(transport.urls(), vec!["https://api.example.com/a", "https://api.example.com/b"]);
    }

    #[test]
    fn non_critical_failure_continues() {
        let transport = ScriptedTransport::default()
            .route("https://api.example.com/a", Err(TransportError::Timeout { timeout_ms: 10 }))
            .route("https://api.example.com/b", ok(json!({})));
        let steps = vec![step("a", "{base_url}/a"), step("b", "{base_url}/b")];

        let runner = WorkflowRunner::new(&transport, RunnerOptions::default());
        let result = runner.run_workflow("continue", &steps, &base_context()).expect("valid workflow");

        assert_eq!(result.total_steps, 2);
        assert_eq!(result.passed_steps, 1);
        assert_eq!(result.hard_errors, 1);
        assert_eq!(result.aborted_at_step, None);
    }

    #[test]
    fn expected_auth_errors_do_not_count_as_hard_errors() {
        let transport = ScriptedTransport::default()
            .route("https://api.example.com/forbidden", status(403))
            .route("https://api.example.com/unauthorized", status(401))
            .route("https://api.example.com/broken", status(500));
        let steps = vec![
            step("forbidden", "{base_url}/forbidden"),
            StepDefinition {
                requires_auth: true,
                ..step("unauthorized", "{base_url}/unauthorized")
            },
            step("broken", "{base_url}/broken"),
        ];

        let runner = WorkflowRunner::new(&transport, RunnerOptions::default());
        let result = runner.run_workflow("auth", &steps, &base_context()).expect("valid workflow");

        assert_eq!(result.steps[0].status, StepStatus::PassExpectedAuth);
        assert_eq!(result.steps[1].status, StepStatus::PassExpectedAuth);
        assert_eq!(result.steps[2].status, StepStatus::Fail);
        assert_eq!(result.hard_errors, 1);
    }

    #[test]
    fn failed_steps_do_not_update_context() {
        let transport = ScriptedTransport::default().route("https://api.example.com/a", status(403));
        let steps = vec![StepDefinition {
            context_updates: capture("id", "id"),
            ..step("a", "{base_url}/a")
        }];

        let runner = WorkflowRunner::new(&transport, RunnerOptions::default());
        let result = runner.run_workflow("no-update", &steps, &base_context()).expect("valid workflow");
        assert!(!result.context.contains_key("id"));
    }

    #[test]
    fn missing_path_keeps_deepest_value() {
        let transport = ScriptedTransport::default().route("https://api.example.com/a", ok(json!({ "data": { "other": 1 } })));
        let steps = vec![StepDefinition {
            context_updates: capture("id", "data.id"),
            ..step("a", "{base_url}/a")
        }];

        let runner = WorkflowRunner::new(&transport, RunnerOptions::default());
        let result = runner.run_workflow("lenient", &steps, &base_context()).expect("valid workflow");
        assert_eq!(result.context["id"], json!({ "other": 1 }));
    }

    #[test]
    fn unresolved_placeholders_are_sent_verbatim_unless_strict() {
        let transport = ScriptedTransport::default();
        let steps = vec![step("a", "{base_url}/items/{itemId}")];

        let lenient = WorkflowRunner::new(&transport, RunnerOptions::default());
        let result = lenient.run_workflow("lenient", &steps, &base_context()).expect("valid workflow");
        assert_eq!(transport.urls(), vec!["https://api.example.com/items/{itemId}"]);
        assert_eq!(result.steps[0].unresolved_placeholders, vec!["itemId"]);

        let strict_transport = ScriptedTransport::default();
        let strict = WorkflowRunner::new(
            &strict_transport,
            RunnerOptions {
                strict_placeholders: true,
                ..Default::default()
            },
        );
        let result = strict.run_workflow("strict", &steps, &base_context()).expect("valid workflow");
        assert!(strict_transport.urls().is_empty());
        assert_eq!(result.steps[0].status, StepStatus::Fail);
        assert_eq!(result.hard_errors, 1);
    }

    #[test]
    fn auth_token_is_attached_only_to_protected_steps() {
        let transport = ScriptedTransport::default()
            .route("https://api.example.com/public", ok(json!({})))
            .route("https://api.example.com/private", ok(json!({})));
        let steps = vec![
            step("public", "{base_url}/public"),
            StepDefinition {
                requires_auth: true,
                ..step("private", "{base_url}/private")
            },
        ];
        let runner = WorkflowRunner::new(
            &transport,
            RunnerOptions {
                auth_token: Some("token-1".into()),
                ..Default::default()
            },
        );
        runner.run_workflow("auth", &steps, &base_context()).expect("valid workflow");

        let seen = transport.seen.borrow();
        assert!(!seen[0].headers.contains_key("Authorization"));
        assert_eq!(seen[1].headers["Authorization"], "Bearer token-1");
    }

    #[test]
    fn rerun_produces_identical_counts() {
        let transport = ScriptedTransport::default()
            .route("https://api.example.com/a", ok(json!({ "id": 1 })))
            .route("https://api.example.com/b/1", status(500));
        let steps = vec![
            StepDefinition {
                context_updates: capture("id", "id"),
                ..step("a", "{base_url}/a")
            },
            step("b", "{base_url}/b/{id}"),
        ];
        let runner = WorkflowRunner::new(&transport, RunnerOptions::default());
        let first = runner.run_workflow("rerun", &steps, &base_context()).expect("valid workflow");
        let second = runner.run_workflow("rerun", &steps, &base_context()).expect("valid workflow");

        assert_eq!(
            (first.total_steps, first.passed_steps, first.failed_steps, first.hard_errors),
            (second.total_steps, second.passed_steps, second.failed_steps, second.hard_errors)
        );
        assert_eq!(first.steps[1].url, "https://api.example.com/b/1");
    }

    #[test]
    fn suites_run_workflows_in_order_with_fresh_context() {
        let transport = ScriptedTransport::default()
            .route("https://api.example.com/a", ok(json!({ "id": "from-first" })))
            .route("https://api.example.com/b/{id}", ok(json!({})));
        let mut suite = SuiteDefinition {
            context: base_context(),
            ..Default::default()
        };
        suite.workflows.insert(
            "first".into(),
            WorkflowDefinition {
                workflow: "first".into(),
                description: None,
                steps: vec![StepDefinition {
                    context_updates: capture("id", "id"),
                    ..step("a", "{base_url}/a")
                }],
            },
        );
        suite.workflows.insert(
            "second".into(),
            WorkflowDefinition {
                workflow: "second".into(),
                description: None,
                steps: vec![step("b", "{base_url}/b/{id}")],
            },
        );

        let runner = WorkflowRunner::new(&transport, RunnerOptions::default());
        let results = runner.run_suite(&suite).expect("valid suite");
        let names: Vec<&str> = results.iter().map(|result| result.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(results[1].steps[0].unresolved_placeholders, vec!["id"]);
    }

    #[test]
    fn invalid_suites_send_nothing() {
        let transport = ScriptedTransport::default();
        let mut suite = SuiteDefinition::default();
        suite.workflows.insert(
            "ok".into(),
            WorkflowDefinition {
                workflow: "ok".into(),
                description: None,
                steps: vec![step("a", "https://api.example.com/a")],
            },
        );
        suite.workflows.insert("empty".into(), WorkflowDefinition::default());

        let runner = WorkflowRunner::new(&transport, RunnerOptions::default());
        assert!(runner.run_suite(&suite).is_err());
        assert!(transport.urls().is_empty());
    }

    #[test]
    fn context_keys_outside_placeholder_syntax_are_rejected_before_sending() {
        let transport = ScriptedTransport::default();
        let steps = vec![StepDefinition {
            context_updates: capture("instance id", "instanceId"),
            ..step("list", "{base_url}/instances")
        }];
        let runner = WorkflowRunner::new(&transport, RunnerOptions::default());
        let error = runner.run_workflow("keys", &steps, &base_context()).expect_err("invalid key");
        assert!(matches!(error, WorkflowValidationError::InvalidContextKey { .. }));

        let bad_initial = IndexMap::from([("base url".to_string(), json!("https://api.example.com"))]);
        let error = runner
            .run_workflow("keys", &[step("list", "{base url}/instances")], &bad_initial)
            .expect_err("invalid initial key");
        assert_eq!(error, WorkflowValidationError::InvalidInitialContextKey { key: "base url".into() });

        let mut suite = SuiteDefinition {
            context: IndexMap::from([("account:id".to_string(), json!("123"))]),
            ..Default::default()
        };
        suite.workflows.insert(
            "read".into(),
            WorkflowDefinition {
                workflow: "read".into(),
                description: None,
                steps: vec![step("read", "https://api.example.com/accounts/{account:id}")],
            },
        );
        assert!(matches!(
            runner.run_suite(&suite),
            Err(WorkflowValidationError::InvalidInitialContextKey { .. })
        ));
        assert!(transport.urls().is_empty());
    }
}
