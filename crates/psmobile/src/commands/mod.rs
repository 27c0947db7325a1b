//! Chat command parsing and dispatch.
//!
//! A command line looks like `?sections cs 401 2254`. Trailing optional
//! arguments are told apart by shape: all digits is a term code, anything
//! else is a campus.

pub mod format;

use crate::catalog::{CatalogError, CatalogService, Campus, Term};
use futures::try_join;
use thiserror::Error;
use tracing::{debug, warn};

/// Command names, argument synopses and one-line descriptions.
const USAGE: &[(&str, &str, &str)] = &[
    ("help", "", "show this message"),
    ("subjects", "[campus] [term]", "list subjects"),
    ("courses", "<subject> [campus] [term]", "list a subject's courses"),
    ("course", "<subject> <number> [campus] [term]", "show a course and its sections"),
    ("sections", "<subject> <number> [campus] [term]", "list a course's sections"),
    ("section", "<class number> [term]", "show one section in detail"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Subjects {
        campus: Option<String>,
        term: Option<String>,
    },
    Courses {
        subject: String,
        campus: Option<String>,
        term: Option<String>,
    },
    Course {
        subject: String,
        number: String,
        campus: Option<String>,
        term: Option<String>,
    },
    Sections {
        subject: String,
        number: String,
        campus: Option<String>,
        term: Option<String>,
    },
    Section {
        class_number: String,
        term: Option<String>,
    },
}

/// A command line that names a command but can't be run as written.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command `{name}`. Try `{prefix}help`.")]
    Unknown { name: String, prefix: String },

    #[error("Missing arguments. Usage: {usage}")]
    MissingArgument { usage: String },

    #[error("Too many arguments. Usage: {usage}")]
    TooManyArguments { usage: String },
}

impl Command {
    /// Parses a chat line.
    ///
    /// # Returns
    /// * `None` - The line isn't addressed to the bot
    /// * `Some(Err(CommandError))` - It is, but isn't a valid command
    pub fn parse(prefix: &str, line: &str) -> Option<Result<Self, CommandError>> {
        let rest = line.trim().strip_prefix(prefix)?;
        let mut tokens = rest.split_whitespace();
        let name = tokens.next()?.to_lowercase();
        let args: Vec<&str> = tokens.collect();
        Some(Self::from_parts(prefix, &name, &args))
    }

    fn from_parts(prefix: &str, name: &str, args: &[&str]) -> Result<Self, CommandError> {
        let usage = || {
            USAGE
                .iter()
                .find(|(n, _, _)| *n == name)
                .map(|(n, synopsis, _)| format!("{prefix}{n} {synopsis}").trim_end().to_string())
                .unwrap_or_default()
        };
        let missing = || CommandError::MissingArgument { usage: usage() };
        let too_many = || CommandError::TooManyArguments { usage: usage() };

        match name {
            "help" => Ok(Command::Help),
            "subjects" => {
                let (campus, term) = optional_args(args).ok_or_else(too_many)?;
                Ok(Command::Subjects { campus, term })
            }
            "courses" => {
                let (subject, rest) = args.split_first().ok_or_else(missing)?;
                let (campus, term) = optional_args(rest).ok_or_else(too_many)?;
                Ok(Command::Courses {
                    subject: subject.to_string(),
                    campus,
                    term,
                })
            }
            "course" | "sections" => {
                let [subject, number, rest @ ..] = args else {
                    return Err(missing());
                };
                let (campus, term) = optional_args(rest).ok_or_else(too_many)?;
                let (subject, number) = (subject.to_string(), number.to_string());
                Ok(if name == "course" {
                    Command::Course { subject, number, campus, term }
                } else {
                    Command::Sections { subject, number, campus, term }
                })
            }
            "section" => match args {
                [] => Err(missing()),
                [class_number] => Ok(Command::Section {
                    class_number: class_number.to_string(),
                    term: None,
                }),
                [class_number, term] => Ok(Command::Section {
                    class_number: class_number.to_string(),
                    term: Some(term.to_string()),
                }),
                _ => Err(too_many()),
            },
            _ => Err(CommandError::Unknown {
                name: name.to_string(),
                prefix: prefix.to_string(),
            }),
        }
    }
}

/// Sorts trailing arguments into (campus, term). `None` if either is given
/// twice or there are more than two.
fn optional_args(args: &[&str]) -> Option<(Option<String>, Option<String>)> {
    let mut campus = None;
    let mut term = None;
    for arg in args {
        let slot = if arg.chars().all(|c| c.is_ascii_digit()) {
            &mut term
        } else {
            &mut campus
        };
        if slot.replace(arg.to_string()).is_some() {
            return None;
        }
    }
    Some((campus, term))
}

pub fn help(prefix: &str) -> String {
    let mut lines = vec!["Commands:".to_string()];
    for (name, synopsis, description) in USAGE {
        let call = format!("{prefix}{name} {synopsis}");
        lines.push(format!("  {:<40} {description}", call.trim_end()));
    }
    lines.join("\n")
}

/// Runs `command` against the catalog and renders the reply. Catalog failures
/// are rendered as a short message rather than returned.
pub async fn dispatch(service: &CatalogService, prefix: &str, command: &Command) -> String {
    debug!(?command, "Dispatching command");
    match run(service, prefix, command).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(?command, error = %e, retryable = e.is_retryable(), "Command failed");
            e.user_message()
        }
    }
}

/// Parses and dispatches one chat line; `None` if the line isn't a command.
pub async fn respond(service: &CatalogService, prefix: &str, line: &str) -> Option<String> {
    match Command::parse(prefix, line)? {
        Ok(command) => Some(dispatch(service, prefix, &command).await),
        Err(e) => Some(e.to_string()),
    }
}

async fn run(
    service: &CatalogService,
    prefix: &str,
    command: &Command,
) -> Result<String, CatalogError> {
    Ok(match command {
        Command::Help => help(prefix),
        Command::Subjects { campus, term } => {
            let subjects = service
                .get_subjects(campus.as_deref(), term.as_deref())
                .await?;
            let campus = campus
                .as_deref()
                .and_then(|c| Campus::parse(c).ok())
                .unwrap_or_else(|| service.default_campus().clone());
            format::subjects(campus.code(), &subjects)
        }
        Command::Courses {
            subject,
            campus,
            term,
        } => {
            let courses = service
                .get_courses(subject, campus.as_deref(), term.as_deref())
                .await?;
            format::courses(&subject.to_uppercase(), &term_label(service, term), &courses)
        }
        Command::Course {
            subject,
            number,
            campus,
            term,
        } => {
            let (course, sections) = try_join!(
                service.get_course(subject, number, campus.as_deref(), term.as_deref()),
                service.get_sections(subject, number, campus.as_deref(), term.as_deref())
            )?;
            format::course(&course, &sections)
        }
        Command::Sections {
            subject,
            number,
            campus,
            term,
        } => {
            let sections = service
                .get_sections(subject, number, campus.as_deref(), term.as_deref())
                .await?;
            let course = match sections.first() {
                Some(section) => section.course.to_string(),
                None => format!("{} {}", subject.to_uppercase(), number),
            };
            format::sections(&course, &term_label(service, term), &sections)
        }
        Command::Section { class_number, term } => {
            let details = service
                .get_section_details(class_number, term.as_deref())
                .await?;
            format::section_details(&details)
        }
    })
}

/// Human name of the term a command ran against. Only called after the
/// service accepted the term, so a parse failure can't happen here.
fn term_label(service: &CatalogService, term: &Option<String>) -> String {
    term.as_deref()
        .and_then(|t| Term::parse(t).ok())
        .unwrap_or_else(|| service.current_term().clone())
        .label()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Option<Result<Command, CommandError>> {
        Command::parse("?", line)
    }

    #[test]
    fn test_lines_without_prefix_are_ignored() {
        assert_eq!(parse("sections cs 0401"), None);
        assert_eq!(parse("?"), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse("?help"), Some(Ok(Command::Help)));
        assert_eq!(
            parse("  ?Sections cs 401 "),
            Some(Ok(Command::Sections {
                subject: "cs".into(),
                number: "401".into(),
                campus: None,
                term: None,
            }))
        );
        assert_eq!(
            parse("?course MATH 0220 2257 johnstown"),
            Some(Ok(Command::Course {
                subject: "MATH".into(),
                number: "0220".into(),
                campus: Some("johnstown".into()),
                term: Some("2257".into()),
            }))
        );
        assert_eq!(
            parse("?section 12345 2254"),
            Some(Ok(Command::Section {
                class_number: "12345".into(),
                term: Some("2254".into()),
            }))
        );
        assert_eq!(
            parse("?subjects UPJ"),
            Some(Ok(Command::Subjects {
                campus: Some("UPJ".into()),
                term: None,
            }))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse("?sections CS"),
            Some(Err(CommandError::MissingArgument {
                usage: "?sections <subject> <number> [campus] [term]".into()
            }))
        );
        assert_eq!(
            parse("?courses CS 2254 2257"),
            Some(Err(CommandError::TooManyArguments {
                usage: "?courses <subject> [campus] [term]".into()
            }))
        );
        assert!(matches!(
            parse("?section"),
            Some(Err(CommandError::MissingArgument { .. }))
        ));
        assert_eq!(
            parse("?enroll CS 0401"),
            Some(Err(CommandError::Unknown {
                name: "enroll".into(),
                prefix: "?".into()
            }))
        );
    }

    #[test]
    fn test_multi_character_prefix() {
        assert_eq!(Command::parse("??", "??help"), Some(Ok(Command::Help)));
        assert_eq!(Command::parse("??", "?help"), None);
    }

    #[test]
    fn test_help_lists_every_command() {
        let text = help("?");
        for (name, _, _) in USAGE {
            assert!(text.contains(&format!("?{name}")), "help is missing {name}");
        }
    }
}
