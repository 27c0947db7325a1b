//! Section detail page parsing.
//!
//! The page title reads "CS 0401 - 1030". The body is a column of `div`s
//! inside `section section`: `role` divs are headings (the all-caps one is the
//! course title), every other div is a label line followed by its value.
//! Room info is wrapped in a map link, so `a > div` is read too.

use super::fields::{Field, FieldTable, RawRecord};
use super::markers::{self, Outcome};
use super::{
    build_section, element_lines, element_text, extract_root, label_pairs, unwrap_embedded_json,
    Root,
};
use crate::catalog::client::{RawBody, RequestKind};
use crate::catalog::error::CatalogError;
use crate::catalog::types::{Campus, Course, CourseRef, SeatRestriction, SectionDetails, Term};
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, warn};

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("head > title").unwrap());
static DETAIL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("section section > div, section section > a > div").unwrap());
static TITLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]+)\s+(\S+)\s+-\s+(\S+)").unwrap());
static CLASS_NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)\)").unwrap());

const COMBINED_SECTION_HEADING: &str = "Combined Section";
const RESTRICTIONS_HEADING: &str = "Enrollment Restrictions";
const DESCRIPTION_HEADING: &str = "Description";

/// Everything the section page yields before it is assembled into
/// [`SectionDetails`].
#[derive(Debug, Default)]
struct DetailPage {
    course: Option<CourseRef>,
    section_number: Option<String>,
    course_title: Option<String>,
    record: RawRecord,
    seat_restrictions: Vec<SeatRestriction>,
    combined_sections: Vec<String>,
}

/// Parses the detail page for `class_number`.
///
/// # Returns
/// * `Err(NotFound)` - The page exists but shows no section
/// * `Err(MalformedResponse)` - The page shows a section missing required fields
pub fn parse_section_detail(
    body: &RawBody,
    class_number: &str,
    term: &Term,
    default_campus: &Campus,
) -> Result<SectionDetails, CatalogError> {
    let not_found = || CatalogError::not_found(format!("class number {class_number} in {}", term.label()));

    let root = unwrap_embedded_json(extract_root(body)?, &DETAIL_SELECTOR);
    match markers::check(RequestKind::SectionDetail, &root)? {
        Outcome::Records => {}
        Outcome::Empty | Outcome::NotFound => return Err(not_found()),
    }

    let table = FieldTable::for_kind(RequestKind::SectionDetail);
    let page = match &root {
        Root::Html(document) => html_page(table, document),
        Root::Json(value) => json_page(table, value),
    };

    let Some(course_ref) = page.course.clone() else {
        if page.record.has(Field::ClassNumber) {
            return Err(CatalogError::malformed(format!(
                "section page for {class_number} names no course"
            )));
        }
        debug!(class_number, "Section page shows no section");
        return Err(not_found());
    };

    assemble(page, course_ref, class_number, term, default_campus)
}

fn assemble(
    mut page: DetailPage,
    course_ref: CourseRef,
    class_number: &str,
    term: &Term,
    default_campus: &Campus,
) -> Result<SectionDetails, CatalogError> {
    if let Some(listed) = page.record.text(Field::ClassNumber) {
        if listed != class_number {
            warn!(requested = class_number, listed = %listed, "Section page shows a different class number");
        }
    }
    page.record.insert(Field::ClassNumber, class_number.to_string());
    if let Some(number) = page.section_number.take() {
        page.record.insert(Field::SectionNumber, number);
    }

    let record = &page.record;
    let title = page
        .course_title
        .clone()
        .or_else(|| record.text(Field::CourseTitle))
        .ok_or_else(|| CatalogError::malformed(format!("section page for {course_ref} has no course title")))?;

    let section = build_section(record, course_ref.clone(), term, default_campus)?;
    let mut combined_sections = page.combined_sections;
    for number in record.list(Field::CombinedSections) {
        if !combined_sections.contains(number) {
            combined_sections.push(number.clone());
        }
    }
    combined_sections.retain(|n| n != class_number);

    Ok(SectionDetails {
        section,
        course: Course {
            subject_code: course_ref.subject_code,
            course_number: course_ref.course_number,
            title,
            description: record.text(Field::Description),
        },
        units: record.leading_number(Field::Units),
        career: record.text(Field::Career),
        grading: record.text(Field::Grading),
        consent: record.text(Field::Consent),
        notes: record.text(Field::Notes),
        requirements: record.text(Field::Requirements),
        components: record.list(Field::Components).to_vec(),
        attributes: record.list(Field::Attributes).to_vec(),
        seats_taken: record.count(Field::SeatsTaken),
        waitlist_capacity: record.count(Field::WaitlistCapacity),
        seat_restrictions: page.seat_restrictions,
        combined_sections,
    })
}

fn html_page(table: &FieldTable, document: &Html) -> DetailPage {
    let mut page = DetailPage::default();

    // The course title is in the HTML head rather than the body
    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|el| element_text(&el))
        .unwrap_or_default();
    if let Some(caps) = TITLE_REGEX.captures(&title) {
        page.course = Some(CourseRef::new(caps[1].to_uppercase(), &caps[2]));
        page.section_number = Some(caps[3].to_string());
    }

    let mut heading = String::new();
    for element in document.select(&DETAIL_SELECTOR) {
        if element.value().attr("role").is_some() {
            heading = element_text(&element);
            // Heading is course title (which is always in all caps)
            if is_all_caps(&heading) && page.course_title.is_none() {
                page.course_title = Some(heading.clone());
            }
            continue;
        }

        let lines = element_lines(&element);
        if heading == COMBINED_SECTION_HEADING {
            if let Some(caps) = lines.iter().find_map(|l| CLASS_NUMBER_REGEX.captures(l)) {
                page.combined_sections.push(caps[1].to_string());
            }
            continue;
        }
        if heading == DESCRIPTION_HEADING {
            page.record.insert(Field::Description, lines.join(" "));
            continue;
        }

        match lines.as_slice() {
            [] => {}
            [single] => {
                for (label, value) in label_pairs(std::slice::from_ref(single)) {
                    page.record.insert_label(table, &label, &value);
                }
            }
            [label, value, extra @ ..] => {
                if heading == RESTRICTIONS_HEADING {
                    let seats: String = value.chars().filter(char::is_ascii_digit).collect();
                    match seats.parse() {
                        Ok(seats) => page.seat_restrictions.push(SeatRestriction {
                            label: label.clone(),
                            seats,
                        }),
                        Err(_) => warn!(label = %label, value = %value, "Unreadable seat restriction"),
                    }
                    continue;
                }
                match table.lookup(label) {
                    Some(Field::Components) => page
                        .record
                        .insert_many(Field::Components, value.split(", ").map(str::to_string).collect()),
                    Some(Field::Attributes) => {
                        let mut values = vec![value.clone()];
                        values.extend(extra.iter().cloned());
                        page.record.insert_many(Field::Attributes, values);
                    }
                    _ => {
                        page.record.insert_label(table, label, value);
                    }
                }
            }
        }
    }

    page
}

fn json_page(table: &FieldTable, root: &Value) -> DetailPage {
    let info = root.get("section_info").unwrap_or(root);
    let record = RawRecord::from_json(table, info);
    let course = match (record.text(Field::SubjectCode), record.text(Field::CourseNumber)) {
        (Some(subject), Some(number)) => Some(CourseRef::new(subject.to_uppercase(), number)),
        _ => None,
    };
    DetailPage {
        course,
        record,
        ..DetailPage::default()
    }
}

fn is_all_caps(text: &str) -> bool {
    text.chars().any(char::is_alphabetic) && !text.chars().any(char::is_lowercase)
}
