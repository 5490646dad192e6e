//! Dotted-path accessors over `serde_json::Value`.
//!
//! Paths look like `data.items[0].id` or `data.items.0.id`. Object segments
//! are looked up by key; numeric segments index into arrays.

use serde_json::Value;

/// Result of walking a dotted path through a JSON document.
#[derive(Debug, Clone, PartialEq)]
pub struct PathLookup<'a> {
    /// Deepest value reached.
    pub value: &'a Value,
    /// Number of segments that resolved before the walk stopped.
    pub resolved_segments: usize,
    /// First segment that could not be resolved, if any.
    pub missing_segment: Option<String>,
}

impl PathLookup<'_> {
    /// True when every segment resolved.
    pub fn is_complete(&self) -> bool {
        self.missing_segment.is_none()
    }
}

/// Split a dotted path into segments, turning `[n]` indexes into their own segment.
pub fn split_path_segments(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut characters = path.chars().peekable();

    while let Some(character) = characters.next() {
        match character {
            '.' => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
                let mut inner = String::new();
                while let Some(next_character) = characters.next() {
                    if next_character == ']' {
                        break;
                    }
                    inner.push(next_character);
                }
                let inner = inner.trim();
                if !inner.is_empty() {
                    segments.push(inner.to_string());
                }
            }
            _ => current.push(character),
        }
    }

    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Walk `path` one segment at a time, stopping at the first missing field.
///
/// A missing field is not an error: the walk keeps the last value it reached
/// and reports which segment was absent.
pub fn walk_path_lenient<'a>(root: &'a Value, path: &str) -> PathLookup<'a> {
    let mut current = root;
    let mut resolved_segments = 0;

    for segment in split_path_segments(path) {
        match step_into(current, &segment) {
            Some(next) => {
                current = next;
                resolved_segments += 1;
            }
            None => {
                return PathLookup {
                    value: current,
                    resolved_segments,
                    missing_segment: Some(segment),
                };
            }
        }
    }

    PathLookup {
        value: current,
        resolved_segments,
        missing_segment: None,
    }
}

fn step_into<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|index| items.get(index)),
        _ => None,
    }
}
