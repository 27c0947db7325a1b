/// Types for catalog data
use super::error::CatalogError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static TERM_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^2\d\d[147]$").unwrap());

/// A PeopleSoft academic term code such as `2254` (Spring 2025).
///
/// Codes have the shape `2YYS`: a leading `2`, the last two digits of the
/// year the academic year ends in, and a season digit (`1` fall, `4` spring,
/// `7` summer).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Term(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Fall,
    Spring,
    Summer,
}

impl Term {
    /// Parses a literal term code, rejecting anything that isn't `2YY[147]`.
    pub fn parse(code: &str) -> Result<Self, CatalogError> {
        let code = code.trim();
        if TERM_REGEX.is_match(code) {
            Ok(Self(code.to_string()))
        } else {
            Err(CatalogError::invalid(
                "term",
                format!("`{code}` isn't a term code like 2254"),
            ))
        }
    }

    /// The term in session on `date`.
    ///
    /// January through April is spring, May through July is summer, and
    /// August onward is the fall term of the next academic year.
    pub fn for_date(date: chrono::NaiveDate) -> Self {
        use chrono::Datelike;

        let (year, season) = match date.month() {
            1..=4 => (date.year(), '4'),
            5..=7 => (date.year(), '7'),
            _ => (date.year() + 1, '1'),
        };
        Self(format!("2{:02}{}", year.rem_euclid(100), season))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn season(&self) -> Season {
        match self.0.as_bytes()[3] {
            b'1' => Season::Fall,
            b'4' => Season::Spring,
            _ => Season::Summer,
        }
    }

    /// Calendar year the term takes place in.
    pub fn year(&self) -> i32 {
        let yy: i32 = self.0[1..3].parse().unwrap_or_default();
        let academic_year_end = 2000 + yy;
        match self.season() {
            Season::Fall => academic_year_end - 1,
            Season::Spring | Season::Summer => academic_year_end,
        }
    }

    /// Human readable name, e.g. "Spring 2025".
    pub fn label(&self) -> String {
        let season = match self.season() {
            Season::Fall => "Fall",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
        };
        format!("{season} {}", self.year())
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Term {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Term::parse(&value)
    }
}

impl From<Term> for String {
    fn from(term: Term) -> Self {
        term.0
    }
}

/// Campus codes the catalog knows about, with the short names users type and
/// the names the section pages print.
const CAMPUSES: &[(&str, &str, &str)] = &[
    ("PIT", "main", "Pittsburgh"),
    ("UPB", "bradford", "Bradford"),
    ("UPG", "greensburg", "Greensburg"),
    ("UPJ", "johnstown", "Johnstown"),
    ("UPT", "titusville", "Titusville"),
];

/// A campus filter, stored as its catalog code (e.g. `PIT`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Campus(String);

impl Campus {
    pub const MAIN: &'static str = "PIT";

    /// Accepts a campus code or name, case-insensitively.
    pub fn parse(value: &str) -> Result<Self, CatalogError> {
        let value = value.trim();
        CAMPUSES
            .iter()
            .find(|(code, name, _)| {
                code.eq_ignore_ascii_case(value) || name.eq_ignore_ascii_case(value)
            })
            .map(|(code, _, _)| Self(code.to_string()))
            .ok_or_else(|| {
                let known: Vec<&str> = CAMPUSES.iter().map(|(_, name, _)| *name).collect();
                CatalogError::invalid(
                    "campus",
                    format!("`{value}` isn't one of {}", known.join(", ")),
                )
            })
    }

    /// Reads a campus as a page prints it ("Pittsburgh Campus", "UPJ", ...).
    pub fn from_display(value: &str) -> Option<Self> {
        let lower = value.trim().to_lowercase();
        let stem = lower.strip_suffix(" campus").unwrap_or(&lower).trim();
        CAMPUSES
            .iter()
            .find(|(code, name, display)| {
                code.eq_ignore_ascii_case(stem)
                    || name.eq_ignore_ascii_case(stem)
                    || display.eq_ignore_ascii_case(stem)
            })
            .map(|(code, _, _)| Self(code.to_string()))
    }

    pub fn main() -> Self {
        Self(Self::MAIN.to_string())
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl Default for Campus {
    fn default() -> Self {
        Self::main()
    }
}

impl fmt::Display for Campus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Campus {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Campus::parse(&value)
    }
}

impl From<Campus> for String {
    fn from(campus: Campus) -> Self {
        campus.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub code: String,  // e.g., "CS"
    pub name: String,  // e.g., "Computer Science"
}

/// A (subject, course number) pair, e.g. `CS 0401`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourseRef {
    pub subject_code: String,
    pub course_number: String,
}

impl CourseRef {
    pub fn new(subject_code: impl Into<String>, course_number: impl Into<String>) -> Self {
        Self {
            subject_code: subject_code.into(),
            course_number: course_number.into(),
        }
    }
}

impl fmt::Display for CourseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.subject_code, self.course_number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub subject_code: String,
    pub course_number: String,
    pub title: String,
    pub description: Option<String>,
}

impl Course {
    pub fn course_ref(&self) -> CourseRef {
        CourseRef::new(&self.subject_code, &self.course_number)
    }
}

/// One section of a course, as listed by a class search or a section page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub class_number: String,
    pub course: CourseRef,
    pub session_code: String,
    pub instruction_mode: String,
    pub instructor: Option<String>,
    pub meeting_pattern: Option<String>,
    pub seats_open: Option<u32>,
    pub seats_total: Option<u32>,
    pub term: Term,
    pub campus: Campus,

    pub section_number: Option<String>, // e.g., "1030"
    pub component: Option<String>,      // e.g., "LEC"
    pub room: Option<String>,
    pub dates: Option<String>,
    pub status: Option<String>,
    pub waitlist_size: Option<u32>,
}

/// Seats held back for a group of students (e.g. "Reserved for CS majors").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatRestriction {
    pub label: String,
    pub seats: u32,
}

/// Everything the section detail page says about one class number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDetails {
    pub section: Section,
    pub course: Course,
    pub units: Option<u32>,
    pub career: Option<String>,
    pub grading: Option<String>,
    pub consent: Option<String>,
    pub notes: Option<String>,
    pub requirements: Option<String>,
    pub components: Vec<String>,
    pub attributes: Vec<String>,
    pub seats_taken: Option<u32>,
    pub waitlist_capacity: Option<u32>,
    pub seat_restrictions: Vec<SeatRestriction>,
    pub combined_sections: Vec<String>, // class numbers
}
