//! Response parsing: raw catalog bodies into typed records.
//!
//! Every parser follows the same shape: extract the root container, check the
//! request kind's markers, then map each element through the kind's field
//! table. Low-level JSON/HTML errors never escape; they become
//! `MalformedResponse`.

mod class_search;
mod fields;
mod markers;
mod section_detail;
mod subjects;

pub use class_search::{parse_course_detail, parse_courses, parse_sections};
pub use fields::{Field, FieldTable, RawRecord, FIELD_TABLE_VERSION};
pub use section_detail::parse_section_detail;
pub use subjects::parse_subjects;

use super::client::RawBody;
use super::error::CatalogError;
use super::types::{Campus, CourseRef, Section, Term};
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

/// Elements that may carry a JSON payload inside an HTML wrapper, most
/// specific first.
static PAYLOAD_SELECTORS: LazyLock<[Selector; 3]> = LazyLock::new(|| {
    [
        Selector::parse("script[type='application/json']").unwrap(),
        Selector::parse("pre").unwrap(),
        Selector::parse("body").unwrap(),
    ]
});

/// Instruction mode reported when a section block doesn't name one.
pub const UNSPECIFIED_INSTRUCTION_MODE: &str = "Unspecified";
/// Instruction mode implied by an online or remote room.
pub const REMOTE_INSTRUCTION_MODE: &str = "Remote";

/// The outermost structure of a response body.
pub(crate) enum Root {
    Json(Value),
    Html(Html),
}

/// Decides whether `body` is JSON or HTML and parses it accordingly.
pub(crate) fn extract_root(body: &RawBody) -> Result<Root, CatalogError> {
    let text = body.body.trim_start_matches('\u{feff}').trim();
    if text.is_empty() {
        return Err(CatalogError::malformed("empty response body"));
    }

    if text.starts_with('{') || text.starts_with('[') {
        return serde_json::from_str(text)
            .map(Root::Json)
            .map_err(|e| CatalogError::malformed(format!("invalid JSON: {e}")));
    }

    if text.starts_with('<') {
        return Ok(Root::Html(Html::parse_document(text)));
    }

    Err(CatalogError::malformed(
        "response is neither JSON nor an HTML page",
    ))
}

/// Swaps an HTML root for the JSON it wraps when the page has none of the
/// markup matched by `records`. A page with record markup, or one with no
/// readable payload, is returned unchanged.
pub(crate) fn unwrap_embedded_json(root: Root, records: &Selector) -> Root {
    let payload = match &root {
        Root::Html(document) if document.select(records).next().is_none() => {
            embedded_json(document)
        }
        _ => None,
    };
    match payload {
        Some(value) => {
            debug!("Reading JSON payload from HTML wrapper");
            Root::Json(value)
        }
        None => root,
    }
}

fn embedded_json(document: &Html) -> Option<Value> {
    PAYLOAD_SELECTORS
        .iter()
        .flat_map(|selector| document.select(selector))
        .find_map(|element| {
            let text = element.text().collect::<String>();
            let text = text.trim();
            if !(text.starts_with('{') || text.starts_with('[')) {
                return None;
            }
            serde_json::from_str(text).ok()
        })
}

/// The page text outside record blocks: alerts, headers and the title, but
/// nothing a section or course record says about itself.
pub(crate) fn message_text(document: &Html) -> String {
    let mut out = String::new();
    collect_message_text(document.root_element(), &mut out);
    out
}

fn collect_message_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child) = ElementRef::wrap(child) {
            if is_record_block(&child) {
                continue;
            }
            collect_message_text(child, out);
        }
    }
}

fn is_record_block(element: &ElementRef) -> bool {
    let value = element.value();
    matches!(value.name(), "script" | "style")
        || value.classes().any(|class| class == "section-content")
}

/// Finds the record array in a JSON root: the root itself, or the first of
/// `keys` holding an array.
pub(crate) fn json_records<'a>(root: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    if let Value::Array(items) = root {
        return Some(items);
    }
    keys.iter().find_map(|key| root.get(*key).and_then(Value::as_array))
}

/// The text of an element split into trimmed, non-empty lines.
pub(crate) fn element_lines(element: &ElementRef) -> Vec<String> {
    element
        .text()
        .flat_map(|t| t.split('\n'))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// All text of an element on one line with whitespace collapsed.
pub(crate) fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Pairs up "Label: value" lines. A line that is only "Label:" takes the
/// next line as its value.
pub(crate) fn label_pairs(lines: &[String]) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = &lines[i];
        if let Some(label) = line.strip_suffix(':') {
            if let Some(value) = lines.get(i + 1) {
                pairs.push((label.trim().to_string(), value.clone()));
                i += 2;
                continue;
            }
        } else if let Some((label, value)) = line.split_once(": ") {
            pairs.push((label.trim().to_string(), value.trim().to_string()));
        }
        i += 1;
    }
    pairs
}

/// Builds a `Section` from a normalized record.
///
/// A missing class number or session makes the record unusable. A missing
/// instruction mode falls back to [`REMOTE_INSTRUCTION_MODE`] for an online
/// room and [`UNSPECIFIED_INSTRUCTION_MODE`] otherwise; everything else is
/// optional.
pub(crate) fn build_section(
    record: &RawRecord,
    course: CourseRef,
    term: &Term,
    campus: &Campus,
) -> Result<Section, CatalogError> {
    let required = |field: Field, name: &str| {
        record
            .text(field)
            .ok_or_else(|| CatalogError::malformed(format!("section of {course} has no {name}")))
    };

    let class_number = required(Field::ClassNumber, "class number")?;
    let session_code = required(Field::Session, "session")?;
    let room = record.text(Field::Room);
    let instruction_mode = record
        .text(Field::InstructionMode)
        .unwrap_or_else(|| implied_instruction_mode(room.as_deref()).to_string());

    let campus = record
        .text(Field::Campus)
        .and_then(|value| Campus::from_display(&value))
        .unwrap_or_else(|| campus.clone());

    Ok(Section {
        class_number,
        course,
        session_code,
        instruction_mode,
        instructor: record.person(Field::Instructor),
        meeting_pattern: record.text(Field::MeetingPattern),
        seats_open: record.count(Field::SeatsOpen),
        seats_total: record.count(Field::SeatsTotal),
        term: term.clone(),
        campus,
        section_number: record.text(Field::SectionNumber),
        component: record.text(Field::Component),
        room,
        dates: record.text(Field::Dates),
        status: record.text(Field::Status),
        waitlist_size: record.count(Field::WaitlistSize),
    })
}

fn implied_instruction_mode(room: Option<&str>) -> &'static str {
    let online = room.is_some_and(|room| {
        let room = room.to_lowercase();
        ["online", "remote", "web based"]
            .iter()
            .any(|marker| room.contains(marker))
    });
    if online {
        REMOTE_INSTRUCTION_MODE
    } else {
        UNSPECIFIED_INSTRUCTION_MODE
    }
}
