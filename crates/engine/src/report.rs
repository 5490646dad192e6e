//! Run-level aggregation of workflow results.
//!
//! A [`RunReport`] is what the CLI prints and what the results file contains.
//! Percentages are stored in the 0 to 100 range.

use chrono::{DateTime, Utc};
use dashprobe_types::{StepStatus, WorkflowResult};
use dashprobe_util::stage_segment;
use serde::{Deserialize, Serialize};

/// Success rate needed for a clean pass.
pub const PASS_SUCCESS_RATE: f64 = 90.0;
/// Success rate needed for a pass with warnings.
pub const WARN_SUCCESS_RATE: f64 = 70.0;
/// Clean-URL compliance needed for a pass with warnings.
pub const WARN_URL_COMPLIANCE: f64 = 95.0;

/// Overall outcome of a run, mapped onto the process exit code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Pass,
    PassWithWarnings,
    Fail,
}

impl Verdict {
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Pass => 0,
            Verdict::PassWithWarnings => 1,
            Verdict::Fail => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::PassWithWarnings => "PASS WITH WARNINGS",
            Verdict::Fail => "FAIL",
        }
    }
}

/// Apply the exit thresholds.
pub fn verdict(success_rate: f64, url_compliance: f64, hard_errors: usize) -> Verdict {
    if success_rate >= PASS_SUCCESS_RATE && url_compliance >= 100.0 && hard_errors == 0 {
        Verdict::Pass
    } else if success_rate >= WARN_SUCCESS_RATE && url_compliance >= WARN_URL_COMPLIANCE {
        Verdict::PassWithWarnings
    } else {
        Verdict::Fail
    }
}

/// Free-form facts about how the run was configured.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    pub tool_version: String,
    /// `builtin` or the suite file path.
    pub suite: String,
    pub base_url: Option<String>,
    pub secondary_base_url: Option<String>,
    pub timeout_seconds: u64,
    pub strict_placeholders: bool,
}

/// Aggregate counts across every workflow of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub workflows: usize,
    pub declared_steps: usize,
    pub attempted_steps: usize,
    pub passed_steps: usize,
    pub failed_steps: usize,
    pub skipped_steps: usize,
    pub expected_auth_passes: usize,
    pub hard_errors: usize,
    /// Passed steps over declared steps; skipped steps count against it.
    pub success_rate: f64,
    /// Attempted steps with a clean URL over attempted steps.
    pub clean_url_compliance: f64,
}

/// Unique URLs split by stage-segment classification, first-seen order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UrlCompliance {
    pub clean: Vec<String>,
    pub dirty: Vec<String>,
    /// Stage segments found in dirty URLs, such as `prod`.
    pub stages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub metadata: RunMetadata,
    pub summary: RunSummary,
    pub verdict: Verdict,
    pub exit_code: i32,
    pub url_compliance: UrlCompliance,
    pub workflows: Vec<WorkflowResult>,
}

impl RunReport {
    pub fn from_results(workflows: Vec<WorkflowResult>, started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> Self {
        let mut summary = RunSummary {
            workflows: workflows.len(),
            ..Default::default()
        };
        let mut url_compliance = UrlCompliance::default();
        let mut clean_steps = 0usize;

        for workflow in &workflows {
            summary.declared_steps += workflow.declared_steps;
            summary.attempted_steps += workflow.total_steps;
            summary.passed_steps += workflow.passed_steps;
            summary.failed_steps += workflow.failed_steps;
            summary.skipped_steps += workflow.skipped_steps;
            summary.hard_errors += workflow.hard_errors;

            for step in &workflow.steps {
                if step.status == StepStatus::PassExpectedAuth {
                    summary.expected_auth_passes += 1;
                }
                let bucket = if step.has_clean_url {
                    clean_steps += 1;
                    &mut url_compliance.clean
                } else {
                    if let Some(stage) = stage_segment(&step.url)
                        && !url_compliance.stages.iter().any(|known| known == stage)
                    {
                        url_compliance.stages.push(stage.to_string());
                    }
                    &mut url_compliance.dirty
                };
                if !bucket.contains(&step.url) {
                    bucket.push(step.url.clone());
                }
            }
        }

        summary.success_rate = percentage(summary.passed_steps, summary.declared_steps);
        summary.clean_url_compliance = percentage(clean_steps, summary.attempted_steps);

        let verdict = verdict(summary.success_rate, summary.clean_url_compliance, summary.hard_errors);
        let duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;

        Self {
            started_at,
            finished_at,
            duration_ms,
            metadata: RunMetadata::default(),
            summary,
            verdict,
            exit_code: verdict.exit_code(),
            url_compliance,
            workflows,
        }
    }

    pub fn with_metadata(mut self, metadata: RunMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// `part / whole` as a percentage; an empty denominator counts as 100%.
fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        100.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use dashprobe_types::{HttpMethod, StepResult};
    use indexmap::IndexMap;

    fn step(url: &str, status: StepStatus, clean: bool) -> StepResult {
        StepResult {
            description: "probe".into(),
            url: url.into(),
            method: HttpMethod::Get,
            status,
            http_status_code: None,
            response_time_ms: 1,
            response_size_bytes: 0,
            error: None,
            raw_response: None,
            has_clean_url: clean,
            unresolved_placeholders: vec![],
            critical: false,
        }
    }

    fn workflow(name: &str, declared: usize, steps: Vec<StepResult>) -> WorkflowResult {
        WorkflowResult::from_steps(name, declared, steps, 10, IndexMap::new(), None)
    }

    fn report(workflows: Vec<WorkflowResult>) -> RunReport {
        let started = Utc::now();
        RunReport::from_results(workflows, started, started + Duration::milliseconds(250))
    }

    #[test]
    fn verdict_thresholds() {
        assert_eq!(verdict(100.0, 100.0, 0), Verdict::Pass);
        assert_eq!(verdict(90.0, 100.0, 0), Verdict::Pass);
        assert_eq!(verdict(95.0, 100.0, 1), Verdict::PassWithWarnings);
        assert_eq!(verdict(95.0, 99.0, 0), Verdict::PassWithWarnings);
        assert_eq!(verdict(70.0, 95.0, 3), Verdict::PassWithWarnings);
        assert_eq!(verdict(69.9, 100.0, 0), Verdict::Fail);
        assert_eq!(verdict(100.0, 94.9, 0), Verdict::Fail);
        assert_eq!(Verdict::PassWithWarnings.exit_code(), 1);
    }

    #[test]
    fn aggregates_counts_across_workflows() {
        let report = report(vec![
            workflow(
                "health",
                2,
                vec![
                    step("https://api.example.com/api/health", StepStatus::Pass, true),
                    step("https://api.example.com/api/accounts", StepStatus::PassExpectedAuth, true),
                ],
            ),
            workflow("discovery", 3, vec![step("https://api.example.com/prod/api/discovery", StepStatus::Fail, false)]),
        ]);

        let summary = &report.summary;
        assert_eq!(summary.workflows, 2);
        assert_eq!(summary.declared_steps, 5);
        assert_eq!(summary.attempted_steps, 3);
        assert_eq!(summary.passed_steps, 2);
        assert_eq!(summary.skipped_steps, 2);
        assert_eq!(summary.expected_auth_passes, 1);
        assert_eq!(summary.hard_errors, 1);
        assert!((summary.success_rate - 40.0).abs() < f64::EPSILON);
        assert!((summary.clean_url_compliance - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.url_compliance.dirty, vec!["https://api.example.com/prod/api/discovery"]);
        assert_eq!(report.url_compliance.stages, vec!["prod"]);
        assert_eq!(report.verdict, Verdict::Fail);
        assert_eq!(report.exit_code, 2);
        assert_eq!(report.duration_ms, 250);
    }

    #[test]
    fn clean_passing_run_exits_zero() {
        let report = report(vec![workflow(
            "health",
            2,
            vec![
                step("https://api.example.com/api/health", StepStatus::Pass, true),
                step("https://api.example.com/api/health", StepStatus::Pass, true),
            ],
        )]);
        assert_eq!(report.url_compliance.clean.len(), 1);
        assert_eq!(report.exit_code, 0);
    }

    #[test]
    fn serializes_camel_case() {
        let report = report(vec![]).with_metadata(RunMetadata {
            suite: "builtin".into(),
            ..Default::default()
        });
        let value = serde_json::to_value(&report).expect("serialize report");
        assert_eq!(value["summary"]["successRate"], serde_json::json!(100.0));
        assert_eq!(value["verdict"], serde_json::json!("PASS"));
        assert_eq!(value["metadata"]["suite"], serde_json::json!("builtin"));
    }
}
