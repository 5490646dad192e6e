//! Placeholder templates for step URLs, headers and bodies.
//!
//! A template is tokenized once when the plan is prepared. Rendering walks the
//! token list and looks each placeholder up in the [`RunContext`]; placeholders
//! without a context value are left verbatim and reported back to the caller.
//!
//! Placeholder syntax is `{name}` where `name` is made of ASCII letters,
//! digits, `_`, `-` or `.`. Any other brace is literal text, so JSON-looking
//! strings and empty `{}` pass through untouched. Validation rejects context
//! keys outside that set, so every stored key is reachable from a template.

use dashprobe_types::is_context_key;
use serde_json::{Map, Value};

use crate::resolve::RunContext;

/// One piece of a tokenized template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSegment {
    Literal(String),
    Placeholder(String),
}

/// A tokenized `{name}` template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<TemplateSegment>,
}

/// Output of rendering a template.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rendered<T> {
    pub value: T,
    /// Placeholder names with no context value, first occurrence order, no duplicates.
    pub unresolved: Vec<String>,
}

impl Template {
    /// Tokenize `source` into literal and placeholder segments.
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut remainder = source;

        while let Some(open) = remainder.find('{') {
            literal.push_str(&remainder[..open]);
            let after_open = &remainder[open + 1..];
            match after_open.find('}') {
                Some(close) if is_context_key(&after_open[..close]) => {
                    if !literal.is_empty() {
                        segments.push(TemplateSegment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(TemplateSegment::Placeholder(after_open[..close].to_string()));
                    remainder = &after_open[close + 1..];
                }
                _ => {
                    literal.push('{');
                    remainder = after_open;
                }
            }
        }

        literal.push_str(remainder);
        if !literal.is_empty() {
            segments.push(TemplateSegment::Literal(literal));
        }
        Self { segments }
    }

    /// Placeholder names in order of appearance (may repeat).
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            TemplateSegment::Placeholder(name) => Some(name.as_str()),
            TemplateSegment::Literal(_) => None,
        })
    }

    /// True when the template contains no placeholders.
    pub fn is_literal(&self) -> bool {
        self.placeholders().next().is_none()
    }

    pub fn segments(&self) -> &[TemplateSegment] {
        &self.segments
    }

    /// Substitute context values into the template.
    pub fn render(&self, context: &RunContext) -> Rendered<String> {
        let mut unresolved = Vec::new();
        let value = self.render_into(context, &mut unresolved);
        Rendered { value, unresolved }
    }

    fn render_into(&self, context: &RunContext, unresolved: &mut Vec<String>) -> String {
        let mut output = String::new();
        for segment in &self.segments {
            match segment {
                TemplateSegment::Literal(text) => output.push_str(text),
                TemplateSegment::Placeholder(name) => match context.render(name) {
                    Some(text) => output.push_str(&text),
                    None => {
                        if !unresolved.contains(name) {
                            unresolved.push(name.clone());
                        }
                        output.push('{');
                        output.push_str(name);
                        output.push('}');
                    }
                },
            }
        }
        output
    }
}

/// A JSON body with every string leaf and object key pre-tokenized.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyTemplate {
    /// Numbers, booleans and null are copied as-is.
    Scalar(Value),
    Text(Template),
    Array(Vec<BodyTemplate>),
    Object(Vec<(Template, BodyTemplate)>),
}

impl BodyTemplate {
    pub fn compile(value: &Value) -> Self {
        match value {
            Value::String(text) => BodyTemplate::Text(Template::parse(text)),
            Value::Array(items) => BodyTemplate::Array(items.iter().map(BodyTemplate::compile).collect()),
            Value::Object(map) => BodyTemplate::Object(
                map.iter()
                    .map(|(key, nested)| (Template::parse(key), BodyTemplate::compile(nested)))
                    .collect(),
            ),
            other => BodyTemplate::Scalar(other.clone()),
        }
    }

    /// Render the body; substituted values always land inside JSON strings.
    pub fn render(&self, context: &RunContext) -> Rendered<Value> {
        let mut unresolved = Vec::new();
        let value = self.render_into(context, &mut unresolved);
        Rendered { value, unresolved }
    }

    fn render_into(&self, context: &RunContext, unresolved: &mut Vec<String>) -> Value {
        match self {
            BodyTemplate::Scalar(value) => value.clone(),
            BodyTemplate::Text(template) => Value::String(template.render_into(context, unresolved)),
            BodyTemplate::Array(items) => Value::Array(items.iter().map(|item| item.render_into(context, unresolved)).collect()),
            BodyTemplate::Object(entries) => {
                let mut map = Map::new();
                for (key, nested) in entries {
                    let rendered_key = key.render_into(context, unresolved);
                    map.insert(rendered_key, nested.render_into(context, unresolved));
                }
                Value::Object(map)
            }
        }
    }
}

/// Merge `extra` unresolved names into `target`, keeping first-seen order.
pub fn merge_unresolved(target: &mut Vec<String>, extra: Vec<String>) {
    for name in extra {
        if !target.contains(&name) {
            target.push(name);
        }
    }
}
