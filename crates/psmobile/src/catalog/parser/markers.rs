//! Error / empty / not-found markers per request kind.
//!
//! The phrases come from pages captured while the mobile catalog was live.
//! There is no single marker shared by every page, so each request kind
//! carries its own list. Error markers are always checked first.
//!
//! Phrases are only looked for in the page's own messages, never inside
//! record blocks, so a class note quoting one can't change the outcome.

use super::{message_text, Root};
use crate::catalog::client::RequestKind;
use crate::catalog::error::CatalogError;
use serde_json::Value;

#[derive(Debug)]
struct MarkerTable {
    error_phrases: &'static [&'static str],
    empty_phrases: &'static [&'static str],
    not_found_phrases: &'static [&'static str],
}

static SUBJECT_MARKERS: MarkerTable = MarkerTable {
    error_phrases: &[
        "an unexpected error has occurred",
        "the system is currently unavailable",
    ],
    empty_phrases: &[],
    not_found_phrases: &[],
};

static CLASS_SEARCH_MARKERS: MarkerTable = MarkerTable {
    error_phrases: &[
        "the search took too long to respond",
        "an unexpected error has occurred",
        "the system is currently unavailable",
        "invalid csrf token",
    ],
    empty_phrases: &["no classes found matching your criteria"],
    not_found_phrases: &[],
};

static SECTION_DETAIL_MARKERS: MarkerTable = MarkerTable {
    error_phrases: &[
        "an unexpected error has occurred",
        "the system is currently unavailable",
    ],
    empty_phrases: &[],
    not_found_phrases: &["class section not found", "no class section found"],
};

fn table_for(kind: RequestKind) -> &'static MarkerTable {
    match kind {
        RequestKind::Subjects => &SUBJECT_MARKERS,
        RequestKind::Courses | RequestKind::CourseDetail | RequestKind::Sections => {
            &CLASS_SEARCH_MARKERS
        }
        RequestKind::SectionDetail => &SECTION_DETAIL_MARKERS,
    }
}

/// What the markers say about a response before any records are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// No marker; go read the records
    Records,
    /// The upstream explicitly said "nothing matched"
    Empty,
    /// The upstream explicitly said the looked-up thing doesn't exist
    NotFound,
}

/// Checks `root` for markers.
///
/// A JSON body is judged by its error members alone. An error marker fails
/// with `UpstreamError` even when the payload also carries a valid, empty
/// result array.
pub(crate) fn check(kind: RequestKind, root: &Root) -> Result<Outcome, CatalogError> {
    let document = match root {
        Root::Json(value) => {
            return match json_error(value) {
                Some(message) => Err(CatalogError::upstream(message)),
                None => Ok(Outcome::Records),
            };
        }
        Root::Html(document) => document,
    };

    let table = table_for(kind);
    let lower = message_text(document).to_lowercase();
    if let Some(phrase) = table.error_phrases.iter().find(|p| lower.contains(*p)) {
        return Err(CatalogError::upstream(format!("{kind} page says \"{phrase}\"")));
    }
    if table.not_found_phrases.iter().any(|p| lower.contains(p)) {
        return Ok(Outcome::NotFound);
    }
    if table.empty_phrases.iter().any(|p| lower.contains(p)) {
        return Ok(Outcome::Empty);
    }
    Ok(Outcome::Records)
}

/// A JSON error marker: a non-empty `error`/`errors` member or a
/// `status: "error"` at the root.
fn json_error(value: &Value) -> Option<String> {
    let obj = value.as_object()?;

    for key in ["error", "errors", "error_message"] {
        match obj.get(key) {
            None | Some(Value::Null) | Some(Value::Bool(false)) => {}
            Some(Value::String(s)) if s.trim().is_empty() => {}
            Some(Value::Array(a)) if a.is_empty() => {}
            Some(Value::Object(o)) if o.is_empty() => {}
            Some(Value::String(s)) => return Some(s.trim().to_string()),
            Some(other) => return Some(other.to_string()),
        }
    }

    let status = obj.get("status").and_then(Value::as_str)?;
    if status.eq_ignore_ascii_case("error") || status.eq_ignore_ascii_case("failed") {
        Some(format!("status {status}"))
    } else {
        None
    }
}
