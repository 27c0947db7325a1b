//! Field-name tables mapping upstream keys and page labels to canonical fields.
//!
//! The mobile catalog names the same datum differently depending on the page
//! (`Class Capacity` vs `Combined Section Capacity`, `class_nbr` vs
//! `classNumber`). Each request kind gets one table; anything not listed is
//! ignored. Bump [`FIELD_TABLE_VERSION`] whenever a table changes so parser
//! drift shows up in logs and fixtures.

use crate::catalog::client::RequestKind;
use serde_json::Value;
use tracing::trace;

pub const FIELD_TABLE_VERSION: &str = "psmobile-2022.2";

/// Canonical fields the record builders read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    SubjectCode,
    SubjectName,
    CourseNumber,
    CourseTitle,
    Description,
    ClassNumber,
    SectionNumber,
    Component,
    Session,
    InstructionMode,
    Instructor,
    MeetingPattern,
    Room,
    Dates,
    Status,
    SeatsOpen,
    SeatsTaken,
    SeatsTotal,
    WaitlistSize,
    WaitlistCapacity,
    Units,
    Career,
    Grading,
    Consent,
    Notes,
    Requirements,
    Attributes,
    Components,
    Campus,
    CombinedSections,
}

#[derive(Debug)]
pub struct FieldTable {
    pub name: &'static str,
    entries: &'static [(&'static str, Field)],
}

static SUBJECT_FIELDS: FieldTable = FieldTable {
    name: "subjects",
    entries: &[
        ("subject", Field::SubjectCode),
        ("subject_code", Field::SubjectCode),
        ("code", Field::SubjectCode),
        ("descr", Field::SubjectName),
        ("description", Field::SubjectName),
        ("subject_descr", Field::SubjectName),
        ("name", Field::SubjectName),
    ],
};

/// Class search results: JSON keys and the labels of `section-content` blocks.
static CLASS_SEARCH_FIELDS: FieldTable = FieldTable {
    name: "class search",
    entries: &[
        ("subject", Field::SubjectCode),
        ("subject_code", Field::SubjectCode),
        ("catalog_nbr", Field::CourseNumber),
        ("catalognumber", Field::CourseNumber),
        ("course_num", Field::CourseNumber),
        ("descr", Field::CourseTitle),
        ("course_title", Field::CourseTitle),
        ("title", Field::CourseTitle),
        ("descrlong", Field::Description),
        ("class_nbr", Field::ClassNumber),
        ("classnumber", Field::ClassNumber),
        ("class_num", Field::ClassNumber),
        ("class number", Field::ClassNumber),
        ("class_section", Field::SectionNumber),
        ("section_num", Field::SectionNumber),
        ("section_type", Field::Component),
        ("component", Field::Component),
        ("session", Field::Session),
        ("session_code", Field::Session),
        ("instruction_mode", Field::InstructionMode),
        ("instruction_mode_descr", Field::InstructionMode),
        ("instruction mode", Field::InstructionMode),
        ("instructors", Field::Instructor),
        ("instructor", Field::Instructor),
        ("instructor(s)", Field::Instructor),
        ("meetings", Field::MeetingPattern),
        ("days/times", Field::MeetingPattern),
        ("days_times", Field::MeetingPattern),
        ("room", Field::Room),
        ("meeting dates", Field::Dates),
        ("dates", Field::Dates),
        ("enrl_stat_descr", Field::Status),
        ("status", Field::Status),
        ("enrollment_available", Field::SeatsOpen),
        ("seats open", Field::SeatsOpen),
        ("seats_open", Field::SeatsOpen),
        ("class_capacity", Field::SeatsTotal),
        ("enrl_cap", Field::SeatsTotal),
        ("class capacity", Field::SeatsTotal),
        ("enrollment_total", Field::SeatsTaken),
        ("seats taken", Field::SeatsTaken),
        ("wait_list_total", Field::WaitlistSize),
        ("wait list total", Field::WaitlistSize),
        ("campus", Field::Campus),
        ("location", Field::Campus),
    ],
};

/// Section detail page labels and the nested JSON of the section endpoint.
static SECTION_DETAIL_FIELDS: FieldTable = FieldTable {
    name: "section detail",
    entries: &[
        ("subject", Field::SubjectCode),
        ("catalog_nbr", Field::CourseNumber),
        ("course_title", Field::CourseTitle),
        ("description", Field::Description),
        ("descrlong", Field::Description),
        ("class_nbr", Field::ClassNumber),
        ("class number", Field::ClassNumber),
        ("class_section", Field::SectionNumber),
        ("component", Field::Component),
        ("section_type", Field::Component),
        ("session", Field::Session),
        ("instruction_mode", Field::InstructionMode),
        ("instruction mode", Field::InstructionMode),
        ("instructor(s)", Field::Instructor),
        ("instructors", Field::Instructor),
        ("meets", Field::MeetingPattern),
        ("meetings", Field::MeetingPattern),
        ("room", Field::Room),
        ("dates", Field::Dates),
        ("date_range", Field::Dates),
        ("status", Field::Status),
        ("seats open", Field::SeatsOpen),
        ("enrollment_available", Field::SeatsOpen),
        ("seats taken", Field::SeatsTaken),
        ("enrollment_total", Field::SeatsTaken),
        ("class capacity", Field::SeatsTotal),
        ("combined section capacity", Field::SeatsTotal),
        ("class_capacity", Field::SeatsTotal),
        ("wait list total", Field::WaitlistSize),
        ("wait_list_total", Field::WaitlistSize),
        ("wait list capacity", Field::WaitlistCapacity),
        ("wait_list_capacity", Field::WaitlistCapacity),
        ("units", Field::Units),
        ("career", Field::Career),
        ("acad_career", Field::Career),
        ("grading", Field::Grading),
        ("grading_basis", Field::Grading),
        ("add consent", Field::Consent),
        ("class notes", Field::Notes),
        ("enrollment requirements", Field::Requirements),
        ("req_group", Field::Requirements),
        ("class attributes", Field::Attributes),
        ("attributes", Field::Attributes),
        ("components", Field::Components),
        ("campus", Field::Campus),
        ("location", Field::Campus),
        ("combined_sections", Field::CombinedSections),
    ],
};

impl FieldTable {
    pub fn for_kind(kind: RequestKind) -> &'static FieldTable {
        match kind {
            RequestKind::Subjects => &SUBJECT_FIELDS,
            RequestKind::Courses | RequestKind::CourseDetail | RequestKind::Sections => {
                &CLASS_SEARCH_FIELDS
            }
            RequestKind::SectionDetail => &SECTION_DETAIL_FIELDS,
        }
    }

    /// Looks up a key or label, ignoring case, surrounding whitespace and a
    /// trailing colon.
    pub fn lookup(&self, raw_key: &str) -> Option<Field> {
        let key = normalize_key(raw_key);
        self.entries
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, field)| *field)
    }
}

fn normalize_key(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(':')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Instructor values the catalog uses to mean "nobody yet".
const PLACEHOLDER_NAMES: &[&str] = &["to be announced", "tba", "staff", "-"];

/// One upstream record, normalized to canonical fields. The first value seen
/// for a field wins; later duplicates (deeper nesting, repeated labels) are
/// ignored.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    values: Vec<(Field, Vec<String>)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flattens a JSON object, mapping every key the table knows.
    pub fn from_json(table: &FieldTable, value: &Value) -> Self {
        let mut record = Self::new();
        record.absorb_json(table, None, value);
        record
    }

    fn absorb_json(&mut self, table: &FieldTable, key: Option<&str>, value: &Value) {
        let field = key.and_then(|k| table.lookup(k));
        match (value, field) {
            (Value::Object(map), None) => {
                for (k, v) in map {
                    self.absorb_json(table, Some(k), v);
                }
            }
            (Value::Array(items), Some(field)) => {
                let rendered: Vec<String> = items.iter().filter_map(render_element).collect();
                self.insert_many(field, rendered);
            }
            (Value::Array(_), None) => {
                if let Some(k) = key {
                    trace!(table = table.name, key = k, "Skipping unmapped array");
                }
            }
            (value, Some(field)) => {
                if let Some(text) = render_element(value) {
                    self.insert(field, text);
                }
            }
            _ => {}
        }
    }

    /// Adds a page label/value pair if the table knows the label.
    pub fn insert_label(&mut self, table: &FieldTable, label: &str, value: &str) -> bool {
        match table.lookup(label) {
            Some(field) => {
                self.insert(field, value.to_string());
                true
            }
            None => {
                trace!(table = table.name, label, "Unmapped label");
                false
            }
        }
    }

    pub fn insert(&mut self, field: Field, value: String) {
        self.insert_many(field, vec![value]);
    }

    pub fn insert_many(&mut self, field: Field, values: Vec<String>) {
        let values: Vec<String> = values
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if values.is_empty() || self.has(field) {
            return;
        }
        self.values.push((field, values));
    }

    pub fn has(&self, field: Field) -> bool {
        self.values.iter().any(|(f, _)| *f == field)
    }

    pub fn list(&self, field: Field) -> &[String] {
        self.values
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[])
    }

    /// The field as a single string; multiple values are joined with ", ".
    pub fn text(&self, field: Field) -> Option<String> {
        let values = self.list(field);
        if values.is_empty() {
            None
        } else {
            Some(values.join(", "))
        }
    }

    /// Like [`text`](Self::text) but drops placeholder names.
    pub fn person(&self, field: Field) -> Option<String> {
        let names: Vec<&str> = self
            .list(field)
            .iter()
            .map(String::as_str)
            .filter(|name| !PLACEHOLDER_NAMES.contains(&name.to_lowercase().as_str()))
            .collect();
        if names.is_empty() {
            None
        } else {
            Some(names.join(", "))
        }
    }

    /// A non-negative count. Values that don't parse are treated as absent.
    pub fn count(&self, field: Field) -> Option<u32> {
        let text = self.text(field)?;
        match text.replace(',', "").trim().parse::<u32>() {
            Ok(n) => Some(n),
            Err(_) => {
                trace!(?field, value = %text, "Count did not parse, leaving it absent");
                None
            }
        }
    }

    /// The first run of digits in the field, e.g. `3` from "3 units".
    pub fn leading_number(&self, field: Field) -> Option<u32> {
        let text = self.text(field)?;
        let digits: String = text
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    }
}

/// Renders a JSON scalar or array element to text.
///
/// Objects are reduced to their most descriptive member: meetings become
/// "MoWe 10:00AM-11:15AM", people become their name, sections their class
/// number.
fn render_element(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => {
            if map.contains_key("days") {
                return render_meeting(value);
            }
            ["name", "class_nbr", "descr"]
                .iter()
                .find_map(|key| map.get(*key).and_then(render_element))
        }
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(render_element).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
    }
}

fn render_meeting(meeting: &Value) -> Option<String> {
    let get = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| meeting.get(*k).and_then(Value::as_str))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };
    let days = get(&["days"]);
    let start = get(&["start_time", "meeting_time_start"]);
    let end = get(&["end_time", "meeting_time_end"]);

    let times = match (start, end) {
        (Some(s), Some(e)) => Some(format!("{s}-{e}")),
        (Some(s), None) => Some(s.to_string()),
        _ => None,
    };
    let parts: Vec<String> = [days.map(str::to_string), times].into_iter().flatten().collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_normalizes_labels() {
        let table = FieldTable::for_kind(RequestKind::SectionDetail);
        assert_eq!(table.lookup("Class Capacity"), Some(Field::SeatsTotal));
        assert_eq!(table.lookup("Combined Section Capacity:"), Some(Field::SeatsTotal));
        assert_eq!(table.lookup("  Seats   Open "), Some(Field::SeatsOpen));
        assert_eq!(table.lookup("Location"), Some(Field::Campus));
        assert_eq!(table.lookup("Favorite Color"), None);
    }

    #[test]
    fn test_same_key_means_different_fields_per_kind() {
        let subjects = FieldTable::for_kind(RequestKind::Subjects);
        let search = FieldTable::for_kind(RequestKind::Sections);
        assert_eq!(subjects.lookup("descr"), Some(Field::SubjectName));
        assert_eq!(search.lookup("descr"), Some(Field::CourseTitle));
        assert_eq!(search.lookup("classNumber"), Some(Field::ClassNumber));
    }

    #[test]
    fn test_from_json_flattens_nesting_first_value_wins() {
        let table = FieldTable::for_kind(RequestKind::SectionDetail);
        let value = json!({
            "section_info": {
                "class_details": {
                    "class_nbr": 12345,
                    "session": "Academic Term",
                    "status": "Open"
                },
                "class_availability": {
                    "class_capacity": "30",
                    "enrollment_available": null
                },
                "status": "shadowed"
            }
        });
        let record = RawRecord::from_json(table, &value);
        assert_eq!(record.text(Field::ClassNumber).as_deref(), Some("12345"));
        assert_eq!(record.text(Field::Status).as_deref(), Some("Open"));
        assert_eq!(record.count(Field::SeatsTotal), Some(30));
        assert_eq!(record.count(Field::SeatsOpen), None);
    }

    #[test]
    fn test_arrays_render_people_and_meetings() {
        let table = FieldTable::for_kind(RequestKind::Sections);
        let value = json!({
            "instructors": [{ "name": "Ada Lovelace", "email": "ada@pitt.edu" }, { "name": "Alan Turing" }],
            "meetings": [{ "days": "MoWe", "start_time": "10:00AM", "end_time": "11:15AM" }],
        });
        let record = RawRecord::from_json(table, &value);
        assert_eq!(
            record.person(Field::Instructor).as_deref(),
            Some("Ada Lovelace, Alan Turing")
        );
        assert_eq!(
            record.text(Field::MeetingPattern).as_deref(),
            Some("MoWe 10:00AM-11:15AM")
        );
    }

    #[test]
    fn test_placeholder_instructor_is_absent() {
        let mut record = RawRecord::new();
        record.insert(Field::Instructor, "To be Announced".to_string());
        assert!(record.has(Field::Instructor));
        assert_eq!(record.person(Field::Instructor), None);
    }

    #[test]
    fn test_count_tolerates_garbage() {
        let mut record = RawRecord::new();
        record.insert(Field::SeatsOpen, "n/a".to_string());
        record.insert(Field::SeatsTotal, " 1,200 ".to_string());
        record.insert(Field::Units, "3 units".to_string());
        assert_eq!(record.count(Field::SeatsOpen), None);
        assert_eq!(record.count(Field::SeatsTotal), Some(1200));
        assert_eq!(record.leading_number(Field::Units), Some(3));
    }
}
