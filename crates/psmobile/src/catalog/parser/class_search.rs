//! Class search result parsing.
//!
//! The HTML results are a flat run of `div`s: a `secondary-head` naming a
//! course ("CS 0401 - INTERMEDIATE PROGRAMMING USING JAVA") followed by one
//! `section-content` per section. The JSON form is a `classes` (or
//! `sections`) array with one object per section carrying its course fields.

use super::fields::{Field, FieldTable, RawRecord};
use super::markers::{self, Outcome};
use super::{
    build_section, element_lines, element_text, extract_root, json_records, label_pairs,
    unwrap_embedded_json, Root,
};
use crate::catalog::client::{RawBody, RequestKind};
use crate::catalog::error::CatalogError;
use crate::catalog::types::{Campus, Course, CourseRef, Section, Term};
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, warn};

// Static selectors for parsing - compiled once
static RESULT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.secondary-head, div.section-content").unwrap());
static COURSE_HEADER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]+)\s+(\S+)\s+-\s+(.+)$").unwrap());
static SECTION_LINE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+?)-(\S+)\s*\((\d+)\)$").unwrap());

/// One course and the section records listed under it.
#[derive(Debug)]
struct Listing {
    course: Course,
    sections: Vec<RawRecord>,
}

/// Parses the courses of a subject search, in upstream order.
pub fn parse_courses(body: &RawBody, subject: &str) -> Result<Vec<Course>, CatalogError> {
    let listings = parse_listings(body, RequestKind::Courses, subject)?;
    Ok(listings.into_iter().map(|l| l.course).collect())
}

/// Picks `course` out of a course search.
///
/// # Returns
/// * `Err(NotFound)` - No course with that subject and number was listed
pub fn parse_course_detail(body: &RawBody, course: &CourseRef) -> Result<Course, CatalogError> {
    parse_listings(body, RequestKind::CourseDetail, &course.subject_code)?
        .into_iter()
        .map(|l| l.course)
        .find(|c| same_course(&c.course_ref(), course))
        .ok_or_else(|| CatalogError::not_found(format!("{course}")))
}

/// Parses the sections of `course` from a course search.
///
/// Sections listed under any other course are dropped, so every returned
/// section references `course`.
pub fn parse_sections(
    body: &RawBody,
    course: &CourseRef,
    term: &Term,
    campus: &Campus,
) -> Result<Vec<Section>, CatalogError> {
    let listings = parse_listings(body, RequestKind::Sections, &course.subject_code)?;

    let mut sections = Vec::new();
    for listing in listings {
        let listed = listing.course.course_ref();
        if !same_course(&listed, course) {
            debug!(listed = %listed, wanted = %course, "Dropping sections of another course");
            continue;
        }
        for record in &listing.sections {
            match build_section(record, course.clone(), term, campus) {
                Ok(section) => sections.push(section),
                Err(e) => warn!(error = %e, "Skipping unusable section record"),
            }
        }
    }
    Ok(sections)
}

fn same_course(a: &CourseRef, b: &CourseRef) -> bool {
    a.subject_code.eq_ignore_ascii_case(&b.subject_code) && a.course_number == b.course_number
}

fn parse_listings(
    body: &RawBody,
    kind: RequestKind,
    subject: &str,
) -> Result<Vec<Listing>, CatalogError> {
    let root = unwrap_embedded_json(extract_root(body)?, &RESULT_SELECTOR);
    match markers::check(kind, &root)? {
        Outcome::Records => {}
        Outcome::Empty | Outcome::NotFound => {
            debug!(kind = %kind, "Class search matched nothing");
            return Ok(Vec::new());
        }
    }

    let table = FieldTable::for_kind(kind);
    let listings = match &root {
        Root::Json(value) => json_listings(table, value, subject)?,
        Root::Html(document) => {
            let listings = html_listings(table, document);
            if listings.is_empty() {
                return Err(CatalogError::malformed(
                    "class search page has no results and no empty-result message",
                ));
            }
            listings
        }
    };
    debug!(
        kind = %kind,
        courses = listings.len(),
        sections = listings.iter().map(|l| l.sections.len()).sum::<usize>(),
        "Parsed class search"
    );
    Ok(listings)
}

fn html_listings(table: &FieldTable, document: &Html) -> Vec<Listing> {
    let mut listings: Vec<Listing> = Vec::new();

    for element in document.select(&RESULT_SELECTOR) {
        let classes = element.value().attr("class").unwrap_or_default();

        if classes.contains("secondary-head") {
            let text = element_text(&element);
            match COURSE_HEADER_REGEX.captures(&text) {
                Some(caps) => listings.push(Listing {
                    course: Course {
                        subject_code: caps[1].to_uppercase(),
                        course_number: caps[2].to_string(),
                        title: caps[3].trim().to_string(),
                        description: None,
                    },
                    sections: Vec::new(),
                }),
                None => warn!(header = %text, "Unrecognized course header"),
            }
            continue;
        }

        let Some(listing) = listings.last_mut() else {
            warn!("Section listed before any course header");
            continue;
        };
        listing.sections.push(section_record(table, &element_lines(&element)));
    }

    listings
}

/// Reads a `section-content` block. Its first line is
/// "Section: 1030-LEC (12345)"; the rest are "Label: value" lines.
fn section_record(table: &FieldTable, lines: &[String]) -> RawRecord {
    let mut record = RawRecord::new();
    for (label, value) in label_pairs(lines) {
        if label.eq_ignore_ascii_case("section") {
            if let Some(caps) = SECTION_LINE_REGEX.captures(&value) {
                record.insert(Field::SectionNumber, caps[1].to_string());
                record.insert(Field::Component, caps[2].to_string());
                record.insert(Field::ClassNumber, caps[3].to_string());
            } else {
                warn!(value = %value, "Unrecognized section line");
            }
            continue;
        }
        record.insert_label(table, &label, &value);
    }
    record
}

fn json_listings(
    table: &FieldTable,
    root: &Value,
    subject: &str,
) -> Result<Vec<Listing>, CatalogError> {
    let items = json_records(root, &["classes", "sections", "results"])
        .ok_or_else(|| CatalogError::malformed("JSON body has no class results array"))?;

    let mut listings: Vec<Listing> = Vec::new();
    for item in items {
        let record = RawRecord::from_json(table, item);
        let subject_code = record
            .text(Field::SubjectCode)
            .unwrap_or_else(|| subject.to_string())
            .to_uppercase();
        let (Some(course_number), Some(title)) =
            (record.text(Field::CourseNumber), record.text(Field::CourseTitle))
        else {
            warn!(item = %item, "Skipping class without a course number and title");
            continue;
        };
        let course_ref = CourseRef::new(&subject_code, &course_number);

        match listings
            .iter_mut()
            .find(|l| same_course(&l.course.course_ref(), &course_ref))
        {
            Some(listing) => listing.sections.push(record),
            None => listings.push(Listing {
                course: Course {
                    subject_code,
                    course_number,
                    title,
                    description: record.text(Field::Description),
                },
                sections: vec![record],
            }),
        }
    }
    Ok(listings)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CS_SEARCH: &str = include_str!("../../../tests/fixtures/search_cs.html");
    const CS_0401_SEARCH: &str = include_str!("../../../tests/fixtures/search_cs_0401.html");
    const NO_RESULTS: &str = include_str!("../../../tests/fixtures/search_no_results.html");
    const TOO_SLOW: &str = include_str!("../../../tests/fixtures/search_too_slow.html");
    const JSON_SEARCH: &str = include_str!("../../../tests/fixtures/search_math_0220.json");
    const PLAIN_SEARCH: &str = include_str!("../../../tests/fixtures/search_cs_0449_plain.html");

    fn term() -> Term {
        Term::parse("2254").unwrap()
    }

    #[test]
    fn test_parse_courses_in_page_order() {
        let courses = parse_courses(&RawBody::new(CS_SEARCH), "CS").unwrap();
        let numbers: Vec<&str> = courses.iter().map(|c| c.course_number.as_str()).collect();
        assert_eq!(numbers, vec!["0007", "0401", "0441", "1501"]);
        assert_eq!(courses[1].title, "INTERMEDIATE PROGRAMMING USING JAVA");
        assert!(courses.iter().all(|c| c.subject_code == "CS" && c.description.is_none()));
    }

    #[test]
    fn test_course_detail_matches_exactly() {
        for number in ["0007", "0401", "0441", "1501"] {
            let wanted = CourseRef::new("CS", number);
            let course = parse_course_detail(&RawBody::new(CS_SEARCH), &wanted).unwrap();
            assert_eq!(course.course_ref(), wanted);
        }
    }

    #[test]
    fn test_course_detail_not_listed_is_not_found() {
        let wanted = CourseRef::new("CS", "0449");
        assert!(matches!(
            parse_course_detail(&RawBody::new(CS_SEARCH), &wanted),
            Err(CatalogError::NotFound { .. })
        ));
        assert!(matches!(
            parse_course_detail(&RawBody::new(NO_RESULTS), &wanted),
            Err(CatalogError::NotFound { .. })
        ));
    }

    #[test]
    fn test_parse_sections_all_fields() {
        let course = CourseRef::new("CS", "0401");
        let sections =
            parse_sections(&RawBody::new(CS_0401_SEARCH), &course, &term(), &Campus::main())
                .unwrap();
        assert_eq!(sections.len(), 3);
        assert!(sections.iter().all(|s| s.course == course));

        let first = &sections[0];
        assert_eq!(first.class_number, "12345");
        assert_eq!(first.section_number.as_deref(), Some("1030"));
        assert_eq!(first.component.as_deref(), Some("LEC"));
        assert_eq!(first.session_code, "Academic Term");
        assert_eq!(first.instruction_mode, "In Person");
        assert_eq!(first.instructor.as_deref(), Some("Ada Lovelace"));
        assert_eq!(first.meeting_pattern.as_deref(), Some("MoWe 10:00AM - 11:15AM"));
        assert_eq!(first.room.as_deref(), Some("Sennott Square 5502"));
        assert_eq!(first.dates.as_deref(), Some("01/06/2025 - 04/18/2025"));
        assert_eq!(first.status.as_deref(), Some("Open"));
        assert_eq!(first.seats_open, Some(12));
        assert_eq!(first.seats_total, Some(120));
        assert_eq!(first.waitlist_size, None);
        assert_eq!(first.term, term());
        assert_eq!(first.campus, Campus::main());
    }

    #[test]
    fn test_parse_sections_missing_optionals_are_absent() {
        let course = CourseRef::new("CS", "0401");
        let sections =
            parse_sections(&RawBody::new(CS_0401_SEARCH), &course, &term(), &Campus::main())
                .unwrap();

        // 12347 is "To be Announced" with no seat counts; label split across lines.
        let tba = &sections[2];
        assert_eq!(tba.class_number, "12347");
        assert_eq!(tba.instructor, None);
        assert_eq!(tba.seats_open, None);
        assert_eq!(tba.seats_total, None);
        assert_eq!(tba.waitlist_size, Some(4));
        assert_eq!(tba.room.as_deref(), Some("Online"));
    }

    #[test]
    fn test_parse_sections_skips_records_missing_identifiers() {
        // The fixture's fourth block has no class number.
        let course = CourseRef::new("CS", "0401");
        let sections =
            parse_sections(&RawBody::new(CS_0401_SEARCH), &course, &term(), &Campus::main())
                .unwrap();
        assert!(sections.iter().all(|s| !s.class_number.is_empty()));
        assert_eq!(
            sections.iter().map(|s| s.class_number.as_str()).collect::<Vec<_>>(),
            vec!["12345", "12346", "12347"]
        );
    }

    #[test]
    fn test_parse_sections_drops_other_courses() {
        let course = CourseRef::new("CS", "0441");
        let sections =
            parse_sections(&RawBody::new(CS_SEARCH), &course, &term(), &Campus::main()).unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].class_number, "20011");
        assert_eq!(sections[0].course, course);
    }

    #[test]
    fn test_no_results_page_is_empty_success() {
        let course = CourseRef::new("CS", "0401");
        let sections =
            parse_sections(&RawBody::new(NO_RESULTS), &course, &term(), &Campus::main()).unwrap();
        assert!(sections.is_empty());
        assert!(parse_courses(&RawBody::new(NO_RESULTS), "CS").unwrap().is_empty());
    }

    #[test]
    fn test_too_slow_page_is_upstream_error() {
        assert!(matches!(
            parse_courses(&RawBody::new(TOO_SLOW), "CS"),
            Err(CatalogError::UpstreamError { .. })
        ));
    }

    #[test]
    fn test_json_results_normalize_field_variants() {
        let course = CourseRef::new("MATH", "0220");
        let sections =
            parse_sections(&RawBody::new(JSON_SEARCH), &course, &term(), &Campus::main()).unwrap();
        assert_eq!(sections.len(), 2);

        let lecture = &sections[0];
        assert_eq!(lecture.class_number, "30001");
        assert_eq!(lecture.instructor.as_deref(), Some("Emmy Noether"));
        assert_eq!(lecture.meeting_pattern.as_deref(), Some("MoWeFr 9:00AM-9:50AM"));
        assert_eq!(lecture.seats_open, Some(7));
        assert_eq!(lecture.seats_total, Some(90));

        // Second record spells its fields differently and has junk seat counts.
        let recitation = &sections[1];
        assert_eq!(recitation.class_number, "30002");
        assert_eq!(recitation.component.as_deref(), Some("REC"));
        assert_eq!(recitation.instructor, None);
        assert_eq!(recitation.seats_open, None);
        assert_eq!(recitation.seats_total, Some(30));

        let detail = parse_course_detail(&RawBody::new(JSON_SEARCH), &course).unwrap();
        assert_eq!(detail.title, "Analytic Geometry and Calculus 1");
        assert!(detail.description.as_deref().unwrap().starts_with("Functions"));
    }

    #[test]
    fn test_json_error_marker_beats_empty_array() {
        let body = RawBody::new(r#"{"error": "Search service unavailable", "classes": []}"#);
        assert!(matches!(
            parse_courses(&body, "CS"),
            Err(CatalogError::UpstreamError { .. })
        ));
        assert!(parse_courses(&RawBody::new(r#"{"classes": []}"#), "CS")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_json_wrapped_in_html() {
        let wrapped = format!("<html><body><pre>{JSON_SEARCH}</pre></body></html>");
        let course = CourseRef::new("MATH", "0220");
        let sections =
            parse_sections(&RawBody::new(wrapped.as_str()), &course, &term(), &Campus::main())
                .unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].class_number, "30001");

        let detail = parse_course_detail(&RawBody::new(wrapped.as_str()), &course).unwrap();
        assert_eq!(detail.title, "Analytic Geometry and Calculus 1");

        let scripted = format!(
            r#"<html><head><script type="application/json">{JSON_SEARCH}</script></head><body></body></html>"#
        );
        assert_eq!(parse_courses(&RawBody::new(scripted), "MATH").unwrap().len(), 1);
    }

    #[test]
    fn test_unrecognized_page_is_malformed() {
        let course = CourseRef::new("CS", "0401");
        let page = RawBody::new(
            "<html><body><h1>Scheduled maintenance</h1><p>Back soon.</p></body></html>",
        );
        assert!(matches!(
            parse_sections(&page, &course, &term(), &Campus::main()),
            Err(CatalogError::MalformedResponse { .. })
        ));
        assert!(matches!(
            parse_course_detail(&page, &course),
            Err(CatalogError::MalformedResponse { .. })
        ));
        assert!(matches!(
            parse_courses(&page, "CS"),
            Err(CatalogError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_plain_text_section_blocks() {
        // Blocks carry only Section, Session, Days/Times, Room, Instructor,
        // Meeting Dates and Status lines.
        let course = CourseRef::new("CS", "0449");
        let sections =
            parse_sections(&RawBody::new(PLAIN_SEARCH), &course, &term(), &Campus::main())
                .unwrap();
        assert_eq!(sections.len(), 2);

        let lecture = &sections[0];
        assert_eq!(lecture.class_number, "22001");
        assert_eq!(lecture.section_number.as_deref(), Some("1030"));
        assert_eq!(lecture.component.as_deref(), Some("LEC"));
        assert_eq!(lecture.session_code, "Academic Term");
        assert_eq!(lecture.meeting_pattern.as_deref(), Some("TuTh 1:00PM - 2:15PM"));
        assert_eq!(lecture.room.as_deref(), Some("Benedum Hall 157"));
        assert_eq!(lecture.instructor.as_deref(), Some("Grace Hopper"));
        assert_eq!(lecture.dates.as_deref(), Some("01/06/2025 - 04/18/2025"));
        assert_eq!(lecture.status.as_deref(), Some("Open"));
        assert_eq!(lecture.instruction_mode, "Unspecified");

        let online = &sections[1];
        assert_eq!(online.class_number, "22002");
        assert_eq!(online.instructor, None);
        assert_eq!(online.waitlist_size, Some(3));
        assert_eq!(online.instruction_mode, "Remote");

        let found = parse_course_detail(&RawBody::new(PLAIN_SEARCH), &course).unwrap();
        assert_eq!(found.title, "INTRODUCTION TO SYSTEMS SOFTWARE");
    }
}
