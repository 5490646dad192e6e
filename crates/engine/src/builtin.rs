//! The built-in dashboard suite used when no suite file is given.
//!
//! Context keys seeded by [`builtin_suite`]: `base_url`, `secondary_base_url`,
//! `account_id` and `region`. Account id and region only appear in request
//! payloads.

use dashprobe_types::{ContextUpdate, HttpMethod, StepDefinition, SuiteDefinition, WorkflowDefinition};
use indexmap::IndexMap;
use serde_json::{Value, json};

/// Target values the built-in suite is generated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinSuiteSettings {
    pub base_url: String,
    /// Second deployment of the API; its health endpoint is probed as well.
    pub secondary_base_url: Option<String>,
    pub account_id: String,
    pub region: String,
}

impl BuiltinSuiteSettings {
    /// Initial context for the built-in workflows. Trailing slashes are
    /// trimmed so templates can write `{base_url}/api/...`.
    pub fn context(&self) -> IndexMap<String, Value> {
        let mut context = IndexMap::new();
        context.insert("base_url".to_string(), json!(trim_base(&self.base_url)));
        if let Some(secondary) = &self.secondary_base_url {
            context.insert("secondary_base_url".to_string(), json!(trim_base(secondary)));
        }
        context.insert("account_id".to_string(), json!(self.account_id));
        context.insert("region".to_string(), json!(self.region));
        context
    }
}

/// Build the dashboard suite: health, authentication, discovery, instances and costs.
pub fn builtin_suite(settings: &BuiltinSuiteSettings) -> SuiteDefinition {
    let mut workflows = IndexMap::new();
    let mut add = |name: &str, description: &str, steps: Vec<StepDefinition>| {
        workflows.insert(
            name.to_string(),
            WorkflowDefinition {
                workflow: name.to_string(),
                description: Some(description.to_string()),
                steps,
            },
        );
    };

    let mut health = vec![StepDefinition {
        critical: true,
        ..get("Primary API health check", "{base_url}/api/health")
    }];
    if settings.secondary_base_url.is_some() {
        health.push(get("Secondary API health check", "{secondary_base_url}/api/health"));
    }
    add("health", "Both deployments answer their health endpoints", health);

    add(
        "authentication",
        "Protected endpoints reject anonymous callers",
        vec![
            StepDefinition {
                requires_auth: true,
                ..get("List accounts without credentials", "{base_url}/api/accounts")
            },
            StepDefinition {
                requires_auth: true,
                ..get("Read user profile without credentials", "{base_url}/api/user/profile")
            },
        ],
    );

    add(
        "discovery",
        "Start a resource discovery and follow it to completion",
        vec![
            StepDefinition {
                method: HttpMethod::Post,
                body: Some(json!({
                    "accountId": "{account_id}",
                    "regions": ["{region}"],
                    "resourceTypes": ["ec2", "rds", "s3"]
                })),
                requires_auth: true,
                critical: true,
                context_updates: vec![capture("discoveryId", "discoveryId")],
                ..get("Start discovery", "{base_url}/api/discovery")
            },
            StepDefinition {
                requires_auth: true,
                context_updates: vec![capture("discoveryStatus", "status")],
                ..get("Poll discovery status", "{base_url}/api/discovery/{discoveryId}/status")
            },
            StepDefinition {
                requires_auth: true,
                ..get("Fetch discovery results", "{base_url}/api/discovery/{discoveryId}/results")
            },
        ],
    );

    add(
        "instances",
        "List instances and read the first one back",
        vec![
            StepDefinition {
                requires_auth: true,
                context_updates: vec![capture("instanceId", "instances.0.instanceId")],
                ..get("List instances", "{base_url}/api/instances?region={region}")
            },
            StepDefinition {
                requires_auth: true,
                ..get("Read instance", "{base_url}/api/instances/{instanceId}")
            },
            StepDefinition {
                method: HttpMethod::Patch,
                body: Some(json!({ "tags": { "dashprobe": "verified" } })),
                requires_auth: true,
                ..get("Tag instance", "{base_url}/api/instances/{instanceId}")
            },
        ],
    );

    let cost_base = if settings.secondary_base_url.is_some() {
        "{secondary_base_url}"
    } else {
        "{base_url}"
    };
    add(
        "costs",
        "Cost summary for the configured account",
        vec![
            StepDefinition {
                method: HttpMethod::Post,
                body: Some(json!({ "accountId": "{account_id}", "region": "{region}", "granularity": "MONTHLY" })),
                requires_auth: true,
                ..get("Request cost summary", &format!("{cost_base}/api/costs/summary"))
            },
            StepDefinition {
                requires_auth: true,
                ..get("List cost recommendations", &format!("{cost_base}/api/costs/recommendations"))
            },
        ],
    );

    SuiteDefinition {
        context: settings.context(),
        workflows,
    }
}

fn get(description: &str, url: &str) -> StepDefinition {
    StepDefinition {
        description: description.to_string(),
        url: url.to_string(),
        ..Default::default()
    }
}

fn capture(key: &str, path: &str) -> ContextUpdate {
    ContextUpdate {
        key: key.to_string(),
        path: path.to_string(),
    }
}

fn trim_base(url: &str) -> &str {
    url.trim().trim_end_matches('/')
}
