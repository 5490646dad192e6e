//! # Dashprobe Engine
//!
//! The engine runs HTTP integration workflows: ordered steps whose responses
//! feed later requests through a named run context.
//!
//! ## Key Features
//!
//! - **Suite Loading**: Parses YAML/JSON suite files (single or multi-workflow)
//! - **Template Substitution**: `{key}` placeholders in URLs, headers and bodies
//! - **Context Threading**: Dotted-path captures from responses into the context
//! - **Reporting**: Run-level counts, clean-URL compliance and an exit verdict
//!
//! ## Usage
//!
//! ```rust
//! use dashprobe_engine::parse_suite_file;
//!
//! let temp_dir = tempfile::tempdir()?;
//! let suite_path = temp_dir.path().join("suite.yaml");
//! std::fs::write(&suite_path, r#"
//! workflow: "health"
//! steps:
//!   - description: "API health"
//!     url: "{base_url}/api/health"
//! "#)?;
//!
//! let suite = parse_suite_file(&suite_path)?;
//! for (name, workflow) in &suite.workflows {
//!     println!("Workflow: {} ({} steps)", name, workflow.steps.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`templates`**: Pre-tokenized placeholder templates
//! - **`resolve`**: The run context and value rendering
//! - **`executor`**: Plan preparation and single-step execution
//! - **`workflow`**: The sequential runner and suite file loading
//! - **`builtin`**: The built-in dashboard suite
//! - **`report`**: Aggregation and exit verdict

pub mod builtin;
pub mod executor;
pub mod report;
pub mod resolve;
pub mod templates;
pub mod workflow;

pub use builtin::{BuiltinSuiteSettings, builtin_suite};
pub use executor::{DEFAULT_STEP_TIMEOUT, Plan, PreparedStep, RenderedStep, classify_failure, prepare_plan, run_step};
pub use report::{RunMetadata, RunReport, RunSummary, UrlCompliance, Verdict, verdict};
pub use resolve::RunContext;
pub use templates::{BodyTemplate, Rendered, Template, TemplateSegment};
pub use workflow::document::{parse_suite_file, parse_suite_str};
pub use workflow::runner::{RunnerOptions, WorkflowRunner};
