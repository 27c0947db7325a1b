//! Catalog scraping: term resolution, the psmobile client, response parsing
//! and the service tying them together.
pub mod client;
pub mod config;
pub mod error;
pub mod parser;
pub mod term;
pub mod types;
pub mod validate;

pub use client::{CatalogClient, CatalogRequest, RawBody, RequestKind};
pub use config::CatalogConfig;
pub use error::CatalogError;
pub use term::TermResolver;
pub use types::*;

use tracing::{debug, info};

/// The operations a chat command can ask for.
///
/// Each call validates its arguments, resolves the term, issues exactly one
/// logical catalog request and parses the reply. The service holds no mutable
/// state, so a single instance can be shared across tasks.
#[derive(Debug, Clone)]
pub struct CatalogService {
    client: CatalogClient,
    terms: TermResolver,
    default_campus: Campus,
}

impl CatalogService {
    /// Builds the service from start-up configuration. The current term comes
    /// from the config when set, otherwise from today's date.
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let client = CatalogClient::new(config)?;
        let terms = match &config.current_term {
            Some(term) => TermResolver::new(term.clone()),
            None => TermResolver::from_today(),
        };
        info!(
            base_url = %config.base_url,
            current_term = %terms.current_term(),
            default_campus = %config.default_campus,
            field_tables = parser::FIELD_TABLE_VERSION,
            "Catalog service ready"
        );
        Ok(Self::with_parts(client, terms, config.default_campus.clone()))
    }

    pub fn with_parts(client: CatalogClient, terms: TermResolver, default_campus: Campus) -> Self {
        Self {
            client,
            terms,
            default_campus,
        }
    }

    pub fn current_term(&self) -> &Term {
        self.terms.current_term()
    }

    pub fn default_campus(&self) -> &Campus {
        &self.default_campus
    }

    /// Subjects offered at `campus` in `term`.
    pub async fn get_subjects(
        &self,
        campus: Option<&str>,
        term: Option<&str>,
    ) -> Result<Vec<Subject>, CatalogError> {
        let campus = self.campus(campus)?;
        let term = self.term(term)?;

        let body = self
            .client
            .fetch(&CatalogRequest::Subjects {
                campus: campus.clone(),
                term: Some(term.clone()),
            })
            .await?;
        let subjects = parser::parse_subjects(&body, &campus)?;

        info!(campus = %campus, term = %term, count = subjects.len(), "Listed subjects");
        Ok(subjects)
    }

    /// Courses of `subject_code`, in upstream order.
    pub async fn get_courses(
        &self,
        subject_code: &str,
        campus: Option<&str>,
        term: Option<&str>,
    ) -> Result<Vec<Course>, CatalogError> {
        let subject = validate::validate_subject(subject_code)?;
        let campus = self.campus(campus)?;
        let term = self.term(term)?;

        let body = self
            .client
            .fetch(&CatalogRequest::Courses {
                subject: subject.clone(),
                campus: campus.clone(),
                term: Some(term.clone()),
            })
            .await?;
        let courses = parser::parse_courses(&body, &subject)?;

        info!(subject = %subject, campus = %campus, term = %term, count = courses.len(), "Listed courses");
        Ok(courses)
    }

    /// One course by subject and number.
    ///
    /// # Returns
    /// * `Err(NotFound)` - The catalog doesn't list the course for that term
    pub async fn get_course(
        &self,
        subject_code: &str,
        course_number: &str,
        campus: Option<&str>,
        term: Option<&str>,
    ) -> Result<Course, CatalogError> {
        let course = self.course_ref(subject_code, course_number)?;
        let campus = self.campus(campus)?;
        let term = self.term(term)?;

        let body = self
            .client
            .fetch(&CatalogRequest::CourseDetail {
                course: course.clone(),
                campus,
                term: Some(term.clone()),
            })
            .await?;
        let found = parser::parse_course_detail(&body, &course)?;

        debug!(course = %course, term = %term, title = %found.title, "Found course");
        Ok(found)
    }

    /// Sections of one course. Every returned section references that course.
    pub async fn get_sections(
        &self,
        subject_code: &str,
        course_number: &str,
        campus: Option<&str>,
        term: Option<&str>,
    ) -> Result<Vec<Section>, CatalogError> {
        let course = self.course_ref(subject_code, course_number)?;
        let campus = self.campus(campus)?;
        let term = self.term(term)?;

        let body = self
            .client
            .fetch(&CatalogRequest::Sections {
                course: course.clone(),
                campus: campus.clone(),
                term: Some(term.clone()),
            })
            .await?;
        let sections = parser::parse_sections(&body, &course, &term, &campus)?;

        info!(course = %course, campus = %campus, term = %term, count = sections.len(), "Listed sections");
        Ok(sections)
    }

    /// One section by class number.
    ///
    /// # Returns
    /// * `Err(NotFound)` - No section has that class number in the term
    pub async fn get_section(
        &self,
        class_number: &str,
        term: Option<&str>,
    ) -> Result<Section, CatalogError> {
        self.get_section_details(class_number, term)
            .await
            .map(|details| details.section)
    }

    /// Everything the section page shows for one class number.
    pub async fn get_section_details(
        &self,
        class_number: &str,
        term: Option<&str>,
    ) -> Result<SectionDetails, CatalogError> {
        let class_number = validate::validate_class_number(class_number)?;
        let term = self.term(term)?;

        let body = self
            .client
            .fetch(&CatalogRequest::SectionDetail {
                class_number: class_number.clone(),
                term: term.clone(),
            })
            .await?;
        let details =
            parser::parse_section_detail(&body, &class_number, &term, &self.default_campus)?;

        debug!(
            class_number = %class_number,
            term = %term,
            course = %details.section.course,
            "Found section"
        );
        Ok(details)
    }

    fn campus(&self, campus: Option<&str>) -> Result<Campus, CatalogError> {
        match campus {
            Some(value) => Campus::parse(value),
            None => Ok(self.default_campus.clone()),
        }
    }

    fn term(&self, term: Option<&str>) -> Result<Term, CatalogError> {
        let explicit = term.map(Term::parse).transpose()?;
        Ok(self.terms.resolve(explicit))
    }

    fn course_ref(&self, subject_code: &str, course_number: &str) -> Result<CourseRef, CatalogError> {
        Ok(CourseRef::new(
            validate::validate_subject(subject_code)?,
            validate::validate_course_number(course_number)?,
        ))
    }
}
