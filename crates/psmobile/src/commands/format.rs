//! Plain-text rendering of catalog results for chat replies.

use crate::catalog::{Course, Section, SectionDetails, Subject};
use std::fmt::Write;

const ARTICLES: &[&str] = &["the", "a", "an"];
const CONJUNCTIONS: &[&str] = &["for", "and", "nor", "but", "or", "yet", "so"];
const PREPOSITIONS: &[&str] = &["of", "to", "for", "in"];
const ALL_CAPS: &[&str] = &["cs", "ms"];
const SPECIAL_CAPS: &[(&str, &str)] = &[("phd", "PhD")];

/// Title-cases a catalog title ("INTERMEDIATE PROGRAMMING USING JAVA" ->
/// "Intermediate Programming Using Java"). Small words stay lower-case unless
/// they start the title.
pub fn titlecase(title: &str) -> String {
    title
        .to_lowercase()
        .split_whitespace()
        .enumerate()
        .map(|(i, word)| {
            if ALL_CAPS.contains(&word) {
                return word.to_uppercase();
            }
            if let Some((_, special)) = SPECIAL_CAPS.iter().find(|(w, _)| *w == word) {
                return special.to_string();
            }
            let small = ARTICLES.contains(&word)
                || CONJUNCTIONS.contains(&word)
                || PREPOSITIONS.contains(&word);
            if i != 0 && small {
                word.to_string()
            } else {
                capitalize(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Upper-cases the first letter of every alphabetic run, so "non-majors"
/// becomes "Non-Majors".
fn capitalize(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut at_start = true;
    for c in word.chars() {
        if at_start && c.is_alphabetic() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_start = !c.is_alphabetic();
    }
    out
}

pub fn subjects(campus: &str, subjects: &[Subject]) -> String {
    if subjects.is_empty() {
        return format!("No subjects are listed for campus {campus}.");
    }
    let width = subjects.iter().map(|s| s.code.len()).max().unwrap_or_default();
    let mut out = format!("Available subjects ({campus}):");
    for subject in subjects {
        let _ = write!(out, "\n{:<width$}  {}", subject.code, subject.name);
    }
    out
}

pub fn courses(subject: &str, term: &str, courses: &[Course]) -> String {
    if courses.is_empty() {
        return format!("No {subject} courses are offered in {term}.");
    }
    let mut out = format!("Available {subject} courses ({term}):");
    for course in courses {
        let _ = write!(out, "\n{}  {}", course.course_ref(), titlecase(&course.title));
    }
    out
}

pub fn course_heading(course: &Course) -> String {
    format!("{}: {}", course.course_ref(), titlecase(&course.title))
}

/// A course with its sections for the term, as the `course` command shows it.
pub fn course(course: &Course, sections: &[Section]) -> String {
    let mut out = course_heading(course);
    if let Some(description) = &course.description {
        let _ = write!(out, "\n{description}");
    }
    match sections.len() {
        0 => out.push_str("\nNo sections are scheduled this term."),
        1 => out.push_str("\n1 section:"),
        n => {
            let _ = write!(out, "\n{n} sections:");
        }
    }
    for section in sections {
        let _ = write!(out, "\n  {}", section_line(section));
    }
    out
}

pub fn sections(course: &str, term: &str, sections: &[Section]) -> String {
    if sections.is_empty() {
        return format!("No sections of {course} are scheduled in {term}.");
    }
    let mut out = format!("Sections of {course} ({term}):");
    for section in sections {
        let _ = write!(out, "\n  {}", section_line(section));
    }
    out
}

/// One line per section: "1030 LEC #12345 | MoWe 10:00AM - 11:15AM | Ada Lovelace | Open 12/120".
pub fn section_line(section: &Section) -> String {
    let mut parts = Vec::new();

    let mut id = String::new();
    if let Some(number) = &section.section_number {
        id.push_str(number);
        id.push(' ');
    }
    if let Some(component) = &section.component {
        id.push_str(component);
        id.push(' ');
    }
    let _ = write!(id, "#{}", section.class_number);
    parts.push(id);

    parts.push(section.meeting_pattern.clone().unwrap_or_else(|| "TBA".to_string()));
    parts.push(section.instructor.clone().unwrap_or_else(|| "Staff".to_string()));
    parts.push(section.instruction_mode.clone());

    let mut status = section.status.clone().unwrap_or_default();
    if let Some(seats) = seats(section) {
        if !status.is_empty() {
            status.push(' ');
        }
        status.push_str(&seats);
    }
    if !status.is_empty() {
        parts.push(status);
    }

    parts.join(" | ")
}

fn seats(section: &Section) -> Option<String> {
    match (section.seats_open, section.seats_total) {
        (Some(open), Some(total)) => Some(format!("{open}/{total} open")),
        (Some(open), None) => Some(format!("{open} open")),
        (None, Some(total)) => Some(format!("cap {total}")),
        (None, None) => None,
    }
}

/// The full section page, one "Label: value" line per known field.
pub fn section_details(details: &SectionDetails) -> String {
    let section = &details.section;
    let mut out = format!(
        "{} ({} #{})",
        course_heading(&details.course),
        section.term.label(),
        section.class_number
    );

    let mut line = |label: &str, value: Option<String>| {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            let _ = write!(out, "\n{label}: {value}");
        }
    };

    line("Section", section.section_number.clone());
    line("Type", section.component.clone());
    line("Session", Some(section.session_code.clone()));
    line("Campus", Some(section.campus.to_string()));
    line("Instruction Mode", Some(section.instruction_mode.clone()));
    line("Days/Times", section.meeting_pattern.clone());
    line("Room", section.room.clone());
    line("Instructor(s)", section.instructor.clone());
    line("Dates", section.dates.clone());
    line("Status", section.status.clone());
    line("Units", details.units.map(|u| u.to_string()));
    line("Career", details.career.clone());
    line("Grading", details.grading.clone());
    line("Components", Some(details.components.join(", ")));
    line("Seats", seats(section));
    line("Seats Taken", details.seats_taken.map(|n| n.to_string()));
    line(
        "Wait List",
        match (section.waitlist_size, details.waitlist_capacity) {
            (Some(size), Some(cap)) => Some(format!("{size}/{cap}")),
            (Some(size), None) => Some(size.to_string()),
            _ => None,
        },
    );
    line("Consent", details.consent.clone());
    line("Enrollment Reqs", details.requirements.clone());
    line("Attributes", Some(details.attributes.join("; ")));
    line(
        "Reserved Seats",
        Some(
            details
                .seat_restrictions
                .iter()
                .map(|r| format!("{} ({})", r.label, r.seats))
                .collect::<Vec<_>>()
                .join("; "),
        ),
    );
    line("Combined With", Some(details.combined_sections.join(", ")));
    line("Notes", details.notes.clone());
    line("Description", details.course.description.clone());

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Campus, CourseRef, Term};

    fn section() -> Section {
        Section {
            class_number: "12345".into(),
            course: CourseRef::new("CS", "0401"),
            session_code: "Academic Term".into(),
            instruction_mode: "In Person".into(),
            instructor: Some("Ada Lovelace".into()),
            meeting_pattern: Some("MoWe 10:00AM - 11:15AM".into()),
            seats_open: Some(12),
            seats_total: Some(120),
            term: Term::parse("2254").unwrap(),
            campus: Campus::main(),
            section_number: Some("1030".into()),
            component: Some("LEC".into()),
            room: None,
            dates: None,
            status: Some("Open".into()),
            waitlist_size: None,
        }
    }

    #[test]
    fn test_titlecase() {
        assert_eq!(
            titlecase("INTERMEDIATE PROGRAMMING USING JAVA"),
            "Intermediate Programming Using Java"
        );
        assert_eq!(
            titlecase("INTRO TO CS FOR NON-MAJORS"),
            "Intro to CS for Non-Majors"
        );
        assert_eq!(titlecase("the art of the PHD"), "The Art of the PhD");
        assert_eq!(titlecase("  DATA   STRUCTURES "), "Data Structures");
        assert_eq!(titlecase(""), "");
    }

    #[test]
    fn test_section_line() {
        assert_eq!(
            section_line(&section()),
            "1030 LEC #12345 | MoWe 10:00AM - 11:15AM | Ada Lovelace | In Person | Open 12/120 open"
        );

        let mut bare = section();
        bare.section_number = None;
        bare.component = None;
        bare.meeting_pattern = None;
        bare.instructor = None;
        bare.seats_open = None;
        bare.seats_total = None;
        bare.status = None;
        assert_eq!(section_line(&bare), "#12345 | TBA | Staff | In Person");
    }

    #[test]
    fn test_empty_lists_say_so() {
        assert_eq!(
            sections("CS 0401", "Spring 2025", &[]),
            "No sections of CS 0401 are scheduled in Spring 2025."
        );
        assert_eq!(
            courses("CS", "Spring 2025", &[]),
            "No CS courses are offered in Spring 2025."
        );
    }

    #[test]
    fn test_subjects_are_aligned() {
        let list = vec![
            Subject { code: "CS".into(), name: "Computer Science".into() },
            Subject { code: "ADMPS".into(), name: "Administrative and Policy Studies".into() },
        ];
        assert_eq!(
            subjects("PIT", &list),
            "Available subjects (PIT):\nCS     Computer Science\nADMPS  Administrative and Policy Studies"
        );
    }
}
