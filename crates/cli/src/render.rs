//! Plain-text report printed to stdout.

use dashprobe_engine::RunReport;
use dashprobe_types::{StepResult, StepStatus, WorkflowResult};

const RULE_WIDTH: usize = 72;

pub fn render_report(report: &RunReport) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let summary = &report.summary;
    let mut lines = vec![
        rule.clone(),
        format!("dashprobe {} | suite: {}", report.metadata.tool_version, report.metadata.suite),
        format!("started {}  duration {} ms", report.started_at.to_rfc3339(), report.duration_ms),
        rule.clone(),
    ];

    for workflow in &report.workflows {
        lines.extend(workflow_lines(workflow));
    }

    lines.push(rule);
    lines.push(format!(
        "Steps: {} declared, {} attempted, {} passed ({} expected auth), {} failed, {} skipped",
        summary.declared_steps,
        summary.attempted_steps,
        summary.passed_steps,
        summary.expected_auth_passes,
        summary.failed_steps,
        summary.skipped_steps
    ));
    lines.push(format!("Hard errors: {}", summary.hard_errors));
    lines.push(format!("Success rate: {:.1}%", summary.success_rate));
    lines.push(format!("Clean URL compliance: {:.1}%", summary.clean_url_compliance));
    if !report.url_compliance.dirty.is_empty() {
        lines.push(format!("URLs with stage segments ({}):", report.url_compliance.stages.join(", ")));
        lines.extend(report.url_compliance.dirty.iter().map(|url| format!("  - {url}")));
    }
    lines.push(format!("Verdict: {} (exit {})", report.verdict.label(), report.exit_code));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn workflow_lines(workflow: &WorkflowResult) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        format!(
            "[{:?}] {} ({}/{} passed, {} ms)",
            workflow.status, workflow.name, workflow.passed_steps, workflow.total_steps, workflow.elapsed_ms
        ),
    ];
    for (index, step) in workflow.steps.iter().enumerate() {
        lines.extend(step_lines(index + 1, step));
    }
    if let Some(step) = workflow.aborted_at_step {
        lines.push(format!(
            "  aborted after critical step {step}; {} step(s) skipped",
            workflow.skipped_steps
        ));
    }
    lines
}

fn step_lines(number: usize, step: &StepResult) -> Vec<String> {
    let marker = match step.status {
        StepStatus::Pass => "ok",
        StepStatus::PassExpectedAuth => "ok*",
        StepStatus::Fail => "!!",
    };
    let code = step.http_status_code.map(|code| code.to_string()).unwrap_or_else(|| "---".to_string());
    let mut lines = vec![format!(
        "  {marker:<3} {number:>2}. {} {} -> {code} {} ({} ms, {} bytes)",
        step.method,
        step.url,
        step.status.label(),
        step.response_time_ms,
        step.response_size_bytes
    )];
    if !step.description.is_empty() {
        lines.push(format!("         {}", step.description));
    }
    if let Some(error) = &step.error {
        lines.push(format!("         error: {error}"));
    }
    if !step.unresolved_placeholders.is_empty() {
        lines.push(format!("         unresolved: {}", step.unresolved_placeholders.join(", ")));
    }
    if !step.has_clean_url {
        lines.push("         url carries a stage segment".to_string());
    }
    lines
}
