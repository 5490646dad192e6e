//! Clean-URL classification.
//!
//! A clean URL carries no explicit deployment-stage segment in its path; the
//! dashboard is expected to be served through custom domain mappings.

use tracing::trace;
use url::Url;

/// Path segments that identify an explicit deployment stage.
pub const STAGE_SEGMENTS: &[&str] = &["prod", "staging", "dev"];

/// Returns false when any path segment of `url` is a deployment stage.
///
/// Unparseable input (for example a template that still has placeholders in
/// its host) falls back to scanning the text after the authority.
pub fn has_clean_url(url: &str) -> bool {
    !url_path(url)
        .split('/')
        .any(|segment| STAGE_SEGMENTS.iter().any(|stage| segment.eq_ignore_ascii_case(stage)))
}

/// Returns the stage segment found in `url`, if any.
pub fn stage_segment(url: &str) -> Option<&'static str> {
    url_path(url)
        .split('/')
        .find_map(|segment| STAGE_SEGMENTS.iter().copied().find(|stage| segment.eq_ignore_ascii_case(stage)))
}

fn url_path(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(error) => {
            trace!(url = %url, %error, "url did not parse; scanning raw text");
            raw_path(url).to_string()
        }
    }
}

fn raw_path(url: &str) -> &str {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    match without_query.find("://") {
        Some(scheme_end) => {
            let after_scheme = &without_query[scheme_end + 3..];
            after_scheme.find('/').map(|index| &after_scheme[index..]).unwrap_or("")
        }
        None => without_query,
    }
}
