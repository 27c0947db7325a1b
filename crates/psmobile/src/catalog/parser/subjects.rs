//! Subject table parsing.
//!
//! The search page embeds the subject table as a JS object literal member,
//! `subjects: [ {...}, ... ],`, on a single line. A JSON body of the form
//! `{"subjects": [...]}` is accepted as well.

use super::fields::{Field, FieldTable, RawRecord};
use super::markers::{self, Outcome};
use super::{extract_root, json_records, Root};
use crate::catalog::client::{RawBody, RequestKind};
use crate::catalog::error::CatalogError;
use crate::catalog::types::{Campus, Subject};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, warn};

static EMBEDDED_SUBJECTS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)\bsubjects\s*:\s*(\[.*\])\s*,?\s*$").unwrap());

/// Parses the subject list, keeping subjects offered at `campus`.
///
/// Subjects without campus information are kept.
pub fn parse_subjects(body: &RawBody, campus: &Campus) -> Result<Vec<Subject>, CatalogError> {
    let root = extract_root(body)?;
    match markers::check(RequestKind::Subjects, &root)? {
        Outcome::Records => {}
        Outcome::Empty | Outcome::NotFound => return Ok(Vec::new()),
    }

    let embedded;
    let items = match &root {
        Root::Json(value) => json_records(value, &["subjects"])
            .ok_or_else(|| CatalogError::malformed("JSON body has no subjects array"))?,
        Root::Html(_) => {
            embedded = embedded_subjects(&body.body)?;
            &embedded
        }
    };

    let table = FieldTable::for_kind(RequestKind::Subjects);
    let mut subjects = Vec::with_capacity(items.len());
    for item in items {
        let record = RawRecord::from_json(table, item);
        let Some(code) = record.text(Field::SubjectCode) else {
            warn!(item = %item, "Skipping subject without a code");
            continue;
        };
        if !offered_at(item, campus) {
            continue;
        }
        let code = code.to_uppercase();
        let name = record.text(Field::SubjectName).unwrap_or_else(|| code.clone());
        subjects.push(Subject { code, name });
    }

    debug!(
        campus = %campus,
        total = items.len(),
        kept = subjects.len(),
        "Parsed subjects"
    );
    Ok(subjects)
}

fn embedded_subjects(html: &str) -> Result<Vec<Value>, CatalogError> {
    let literal = EMBEDDED_SUBJECTS_REGEX
        .captures(html)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| CatalogError::malformed("search page has no embedded subject table"))?;

    serde_json::from_str(literal.as_str())
        .map_err(|e| CatalogError::malformed(format!("embedded subject table is not JSON: {e}")))
}

/// Whether a subject lists `campus` among its campuses. The upstream uses an
/// object keyed `campus0`, `campus1`, ...; an array is accepted too.
fn offered_at(item: &Value, campus: &Campus) -> bool {
    let entries: Vec<&Value> = match item.get("campuses") {
        Some(Value::Object(map)) => map.values().collect(),
        Some(Value::Array(items)) => items.iter().collect(),
        _ => return true,
    };
    if entries.is_empty() {
        return true;
    }
    entries.iter().any(|entry| {
        entry
            .get("campus")
            .and_then(Value::as_str)
            .is_some_and(|code| code.eq_ignore_ascii_case(campus.code()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_PAGE: &str = include_str!("../../../tests/fixtures/class_search_page.html");

    #[test]
    fn test_parse_embedded_subjects_for_main_campus() {
        let subjects = parse_subjects(&RawBody::new(SEARCH_PAGE), &Campus::main()).unwrap();
        let codes: Vec<&str> = subjects.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, vec!["ADMPS", "CS", "MATH", "STAT"]);
        assert_eq!(subjects[1].name, "Computer Science");
    }

    #[test]
    fn test_campus_filter() {
        let campus = Campus::parse("johnstown").unwrap();
        let subjects = parse_subjects(&RawBody::new(SEARCH_PAGE), &campus).unwrap();
        let codes: Vec<&str> = subjects.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, vec!["ENGR", "MATH", "STAT"]);
    }

    #[test]
    fn test_json_body_and_field_variants() {
        let body = RawBody::new(
            r#"{"subjects": [
                {"subject": "cs", "descr": "Computer Science"},
                {"subject_code": "HIST", "description": "History"},
                {"descr": "No code here"}
            ]}"#,
        );
        let subjects = parse_subjects(&body, &Campus::main()).unwrap();
        assert_eq!(
            subjects,
            vec![
                Subject { code: "CS".into(), name: "Computer Science".into() },
                Subject { code: "HIST".into(), name: "History".into() },
            ]
        );
    }

    #[test]
    fn test_empty_subject_array_is_empty_success() {
        let subjects = parse_subjects(&RawBody::new(r#"{"subjects": []}"#), &Campus::main()).unwrap();
        assert!(subjects.is_empty());
    }

    #[test]
    fn test_page_without_table_is_malformed() {
        let body = RawBody::new("<html><body><h1>Maintenance</h1></body></html>");
        assert!(matches!(
            parse_subjects(&body, &Campus::main()),
            Err(CatalogError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_broken_embedded_table_is_malformed() {
        let body = RawBody::new("<html><script>var x = {\nsubjects: [{\"subject\": ],\n};</script></html>");
        assert!(matches!(
            parse_subjects(&body, &Campus::main()),
            Err(CatalogError::MalformedResponse { .. })
        ));
    }
}
