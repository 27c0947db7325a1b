//! Argument validation. Everything here runs before a request is built, so a
//! rejected argument never reaches the network.

use super::error::CatalogError;

const MAX_SUBJECT_LEN: usize = 8;
const MAX_COURSE_NUMBER_LEN: usize = 5;
const PADDED_COURSE_NUMBER_LEN: usize = 4;

/// Upper-cases a subject code after checking it is 1-8 ASCII letters.
pub fn validate_subject(subject: &str) -> Result<String, CatalogError> {
    let subject = subject.trim();
    if subject.is_empty() {
        return Err(CatalogError::invalid("subject", "a subject code is required"));
    }
    if subject.len() > MAX_SUBJECT_LEN || !subject.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CatalogError::invalid(
            "subject",
            format!("`{subject}` isn't a subject code like CS or MATH"),
        ));
    }
    Ok(subject.to_ascii_uppercase())
}

/// Normalizes a course number: ASCII alphanumerics, at most five characters.
/// Purely numeric numbers are zero-padded to four digits (`401` -> `0401`).
pub fn validate_course_number(number: &str) -> Result<String, CatalogError> {
    let number = number.trim();
    if number.is_empty() {
        return Err(CatalogError::invalid("course number", "a course number is required"));
    }
    if number.len() > MAX_COURSE_NUMBER_LEN || !number.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CatalogError::invalid(
            "course number",
            format!("`{number}` isn't a course number like 0401"),
        ));
    }
    if number.chars().all(|c| c.is_ascii_digit()) {
        return Ok(format!("{number:0>width$}", width = PADDED_COURSE_NUMBER_LEN));
    }
    Ok(number.to_ascii_uppercase())
}

pub fn validate_class_number(number: &str) -> Result<String, CatalogError> {
    let number = number.trim();
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
        return Err(CatalogError::invalid(
            "class number",
            format!("`{number}` isn't a class number like 12345"),
        ));
    }
    Ok(number.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_is_upper_cased() {
        assert_eq!(validate_subject("cs").unwrap(), "CS");
        assert_eq!(validate_subject(" Math ").unwrap(), "MATH");
        assert_eq!(validate_subject("ADMPS").unwrap(), "ADMPS");
    }

    #[test]
    fn test_bad_subjects() {
        for subject in ["", "   ", "CS0401", "C-S", "TOOLONGSUBJ", "ÉCON"] {
            assert!(
                matches!(validate_subject(subject), Err(CatalogError::InvalidArgument { .. })),
                "{subject:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_course_number_padding() {
        assert_eq!(validate_course_number("401").unwrap(), "0401");
        assert_eq!(validate_course_number("7").unwrap(), "0007");
        assert_eq!(validate_course_number("0401").unwrap(), "0401");
        assert_eq!(validate_course_number("10000").unwrap(), "10000");
        assert_eq!(validate_course_number("1502x").unwrap(), "1502X");
    }

    #[test]
    fn test_bad_course_numbers() {
        for number in ["", "04 01", "123456", "04-01"] {
            assert!(
                matches!(
                    validate_course_number(number),
                    Err(CatalogError::InvalidArgument { .. })
                ),
                "{number:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_class_numbers() {
        assert_eq!(validate_class_number(" 12345 ").unwrap(), "12345");
        assert!(validate_class_number("").is_err());
        assert!(validate_class_number("12a45").is_err());
        assert!(validate_class_number("-12345").is_err());
    }
}
