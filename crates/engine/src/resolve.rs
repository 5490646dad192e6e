//! # Run Context
//!
//! The run context is the key/value mapping threaded between the steps of one
//! workflow run. It is seeded with initial values, filled from response fields
//! after steps pass, and read when URL and body templates are rendered.
//!
//! ```rust
//! use dashprobe_engine::resolve::RunContext;
//! use serde_json::json;
//!
//! let mut context = RunContext::default();
//! context.set("instanceId", json!("i-1"));
//! context.set("count", json!(3));
//!
//! assert_eq!(context.render("instanceId").as_deref(), Some("i-1"));
//! assert_eq!(context.render("count").as_deref(), Some("3"));
//! assert_eq!(context.render("missing"), None);
//! ```

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

/// Mutable key/value context owned by a single workflow run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunContext {
    values: IndexMap<String, Value>,
}

impl RunContext {
    /// Create a context seeded with `initial` values.
    pub fn new(initial: &IndexMap<String, Value>) -> Self {
        Self { values: initial.clone() }
    }

    /// Store `value` under `key`, returning the previous value.
    ///
    /// When two steps write the same key the later write wins.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        let previous = self.values.insert(key.clone(), value);
        if let Some(previous_value) = &previous {
            debug!(key = %key, previous = %previous_value, "context key overwritten");
        }
        previous
    }

    /// Text inserted for `{key}` placeholders, or `None` when the key is absent.
    pub fn render(&self, key: &str) -> Option<String> {
        self.values.get(key).map(render_value)
    }

    /// Copy of the current values, in insertion order.
    pub fn snapshot(&self) -> IndexMap<String, Value> {
        self.values.clone()
    }
}

/// Strings are inserted raw; every other value uses its compact JSON text.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
