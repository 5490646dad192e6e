use std::{path::PathBuf, process::ExitCode, time::Duration};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Parser;
use dashprobe_api::{ProbeClient, ReqwestTransport, validate_base_url};
use dashprobe_engine::{BuiltinSuiteSettings, RunMetadata, RunReport, RunnerOptions, WorkflowRunner, builtin_suite, parse_suite_file};
use dashprobe_types::SuiteDefinition;
use serde_json::Value;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

mod render;
mod results;

/// Exit code for configuration errors; shares the value of a failed run.
const CONFIG_ERROR_EXIT: u8 = 2;

/// Run HTTP integration workflows against a dashboard API and report the outcome.
#[derive(Parser, Debug, Clone)]
#[command(name = "dashprobe", version, about)]
struct Args {
    /// Base URL of the primary API deployment
    #[arg(long, env = "DASHPROBE_BASE_URL")]
    base_url: Option<String>,

    /// Base URL of a second deployment to probe alongside the primary one
    #[arg(long, env = "DASHPROBE_SECONDARY_BASE_URL")]
    secondary_base_url: Option<String>,

    /// Default per-step timeout in seconds
    #[arg(long, env = "DASHPROBE_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Debug-level logging (overridden by RUST_LOG)
    #[arg(short, long, env = "DASHPROBE_VERBOSE")]
    verbose: bool,

    /// Account id used in request payloads
    #[arg(long, env = "DASHPROBE_ACCOUNT_ID", default_value = "000000000000")]
    account_id: String,

    /// Region used in request payloads
    #[arg(long, env = "DASHPROBE_REGION", default_value = "us-east-1")]
    region: String,

    /// YAML/JSON suite file; the built-in dashboard suite runs when omitted
    #[arg(long, env = "DASHPROBE_SUITE")]
    suite: Option<PathBuf>,

    /// Directory the results file is written to
    #[arg(long, env = "DASHPROBE_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Bearer token sent on steps that require auth
    #[arg(long, env = "DASHPROBE_AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    /// Fail steps with unresolved placeholders instead of sending them
    #[arg(long, env = "DASHPROBE_STRICT_PLACEHOLDERS")]
    strict_placeholders: bool,

    /// Skip writing the JSON results file
    #[arg(long, env = "DASHPROBE_NO_RESULTS_FILE")]
    no_results_file: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);
    debug!(suite = ?args.suite, timeout = args.timeout, "dashprobe started");

    match run(&args) {
        Ok(report) => {
            print!("{}", render::render_report(&report));
            ExitCode::from(report.exit_code as u8)
        }
        Err(error) => {
            error!("{error:#}");
            eprintln!("Error: {error:#}");
            ExitCode::from(CONFIG_ERROR_EXIT)
        }
    }
}

/// Logs go to stderr so stdout carries only the report.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init();
}

fn run(args: &Args) -> Result<RunReport> {
    if args.timeout == 0 {
        bail!("--timeout must be at least one second");
    }
    for url in [args.base_url.as_deref(), args.secondary_base_url.as_deref()].into_iter().flatten() {
        validate_base_url(url)?;
    }

    let suite = load_suite(args)?;
    let transport = ReqwestTransport::new(ProbeClient::new()?);
    let runner = WorkflowRunner::new(
        &transport,
        RunnerOptions {
            default_timeout: Duration::from_secs(args.timeout),
            strict_placeholders: args.strict_placeholders,
            auth_token: args.auth_token.clone(),
        },
    );

    let started_at = Utc::now();
    let workflows = runner.run_suite(&suite)?;
    let report = RunReport::from_results(workflows, started_at, Utc::now()).with_metadata(metadata(args));
    info!(
        success_rate = report.summary.success_rate,
        url_compliance = report.summary.clean_url_compliance,
        hard_errors = report.summary.hard_errors,
        exit_code = report.exit_code,
        "run finished"
    );

    if !args.no_results_file {
        let path = results::write_results_file(&report, &args.output_dir)?;
        info!(path = %path.display(), "results written");
    }
    Ok(report)
}

/// Load the suite file, or build the built-in suite, and seed the CLI values
/// into its context. Values given on the command line replace file values.
fn load_suite(args: &Args) -> Result<SuiteDefinition> {
    let Some(path) = &args.suite else {
        let base_url = args
            .base_url
            .clone()
            .context("--base-url (or DASHPROBE_BASE_URL) is required for the built-in suite")?;
        return Ok(builtin_suite(&BuiltinSuiteSettings {
            base_url,
            secondary_base_url: args.secondary_base_url.clone(),
            account_id: args.account_id.clone(),
            region: args.region.clone(),
        }));
    };

    let mut suite = parse_suite_file(path)?;
    let mut seed = |key: &str, value: Option<&str>| {
        if let Some(value) = value {
            suite.context.insert(key.to_string(), Value::String(value.trim_end_matches('/').to_string()));
        }
    };
    seed("base_url", args.base_url.as_deref());
    seed("secondary_base_url", args.secondary_base_url.as_deref());
    suite
        .context
        .entry("account_id".to_string())
        .or_insert_with(|| Value::String(args.account_id.clone()));
    suite
        .context
        .entry("region".to_string())
        .or_insert_with(|| Value::String(args.region.clone()));
    Ok(suite)
}

fn metadata(args: &Args) -> RunMetadata {
    RunMetadata {
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        suite: args
            .suite
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "builtin".to_string()),
        base_url: args.base_url.clone(),
        secondary_base_url: args.secondary_base_url.clone(),
        timeout_seconds: args.timeout,
        strict_placeholders: args.strict_placeholders,
    }
}
