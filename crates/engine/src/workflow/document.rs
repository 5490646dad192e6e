//! Suite file loading.
//!
//! Suite files are YAML or JSON (serde_yaml reads both). Two layouts are
//! accepted: a multi-workflow document with a `workflows` map and an optional
//! `context` map, or a single workflow document with `workflow` and `steps`.

use std::{fs, path::Path};

use anyhow::{Context, Result, bail};
use dashprobe_types::{SuiteDefinition, WorkflowDefinition, validate_suite};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Multi-workflow layout. `workflows` is required so that a single workflow
/// document is never read as an empty suite.
#[derive(Deserialize)]
struct MultiWorkflowDocument {
    #[serde(default)]
    context: IndexMap<String, Value>,
    workflows: IndexMap<String, WorkflowDefinition>,
}

/// Load and validate a suite file.
///
/// Workflow order follows the document. Workflows without a `workflow` name
/// take their map key.
pub fn parse_suite_file(file_path: impl AsRef<Path>) -> Result<SuiteDefinition> {
    let file_path = file_path.as_ref();
    let content = fs::read_to_string(file_path).with_context(|| format!("failed to read suite file: {}", file_path.display()))?;
    let suite = parse_suite_str(&content).with_context(|| format!("invalid suite file: {}", file_path.display()))?;
    debug!(path = %file_path.display(), workflows = suite.workflows.len(), "suite file loaded");
    Ok(suite)
}

/// Parse suite text. See [`parse_suite_file`].
pub fn parse_suite_str(content: &str) -> Result<SuiteDefinition> {
    let mut suite = if let Ok(document) = serde_yaml::from_str::<MultiWorkflowDocument>(content) {
        SuiteDefinition {
            context: document.context,
            workflows: document.workflows,
        }
    } else {
        match serde_yaml::from_str::<WorkflowDefinition>(content) {
            Ok(workflow) if !workflow.steps.is_empty() => {
                let name = if workflow.workflow.trim().is_empty() {
                    "default".to_string()
                } else {
                    workflow.workflow.clone()
                };
                SuiteDefinition {
                    context: IndexMap::new(),
                    workflows: IndexMap::from([(name, workflow)]),
                }
            }
            Ok(_) => bail!("workflow document declares no steps"),
            Err(error) => bail!(
                "unsupported suite document format ({error}). Expected one of:\n\
                 - a single workflow with 'workflow' and 'steps' fields\n\
                 - a multi-workflow document with workflows under the 'workflows' key"
            ),
        }
    };

    suite.normalize_names();
    validate_suite(&suite)?;
    Ok(suite)
}
