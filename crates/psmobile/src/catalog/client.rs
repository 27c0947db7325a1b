//! HTTP client for the PeopleSoft mobile catalog.
//!
//! The mobile site has no API; it is driven the way a phone browser drives it:
//! 1. GET classSearch renders the search form (subject table embedded as JS)
//!    and sets a `CSRFCookie`
//! 2. POST getClassSearch with the form fields and the token echoed back
//!    returns the class search results
//! 3. GET classsection/{institution}/{term}/{class_nbr} renders one section

use super::config::CatalogConfig;
use super::error::CatalogError;
use super::types::{Campus, CourseRef, Term};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE};
use reqwest::{Client, Response};
use scraper::{Html, Selector};
use std::fmt;
use std::sync::LazyLock;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use url::Url;

/// Paths for catalog endpoints, relative to the base URL.
const CLASS_SEARCH_PATH: &str = "/classSearch";
const CLASS_SEARCH_API_PATH: &str = "/getClassSearch";
const SECTION_DETAIL_PATH: &str = "/classsection";

/// Cookie the search form sets; its value must be echoed as `CSRFToken`.
const CSRF_COOKIE: &str = "CSRFCookie";

static CSRF_INPUT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input[name='CSRFToken']").unwrap());

/// The five kinds of request the catalog answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Subjects,
    Courses,
    CourseDetail,
    Sections,
    SectionDetail,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Subjects => "list subjects",
            RequestKind::Courses => "list courses",
            RequestKind::CourseDetail => "course detail",
            RequestKind::Sections => "list sections",
            RequestKind::SectionDetail => "section detail",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request with its parameters already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogRequest {
    Subjects {
        campus: Campus,
        term: Option<Term>,
    },
    Courses {
        subject: String,
        campus: Campus,
        term: Option<Term>,
    },
    CourseDetail {
        course: CourseRef,
        campus: Campus,
        term: Option<Term>,
    },
    Sections {
        course: CourseRef,
        campus: Campus,
        term: Option<Term>,
    },
    SectionDetail {
        class_number: String,
        term: Term,
    },
}

impl CatalogRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            CatalogRequest::Subjects { .. } => RequestKind::Subjects,
            CatalogRequest::Courses { .. } => RequestKind::Courses,
            CatalogRequest::CourseDetail { .. } => RequestKind::CourseDetail,
            CatalogRequest::Sections { .. } => RequestKind::Sections,
            CatalogRequest::SectionDetail { .. } => RequestKind::SectionDetail,
        }
    }
}

/// Form fields of a class search. A blank `catalog_nbr` lists the whole
/// subject; a missing term leaves the choice to the catalog.
fn search_form(
    subject: &str,
    catalog_nbr: &str,
    campus: &Campus,
    term: Option<&Term>,
) -> Vec<(&'static str, String)> {
    vec![
        ("term", term.map(Term::to_string).unwrap_or_default()),
        ("campus", campus.code().to_string()),
        ("acad_career", String::new()),
        ("subject", subject.to_string()),
        ("catalog_nbr", catalog_nbr.to_string()),
        ("class_nbr", String::new()),
    ]
}

/// An uninterpreted response body from a successful request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBody {
    pub status: u16,
    pub url: String,
    pub body: String,
}

impl RawBody {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            url: String::new(),
            body: body.into(),
        }
    }
}

/// Client for the mobile catalog. Stateless apart from the connection pool,
/// so one instance can serve every command concurrently.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
    institution: String,
}

impl CatalogClient {
    /// Creates a client with the timeouts and browser headers from `config`.
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        Url::parse(&config.base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout())
            .build()
            .map_err(|e| CatalogError::Config {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            institution: config.institution.clone(),
        })
    }

    /// Issues `request` and returns the body without interpreting it.
    ///
    /// # Returns
    /// * `Ok(RawBody)` - The body of a 2xx response
    /// * `Err(UpstreamUnavailable)` - Connection failure or timeout
    /// * `Err(UpstreamError)` - Non-success HTTP status
    pub async fn fetch(&self, request: &CatalogRequest) -> Result<RawBody, CatalogError> {
        let correlation_id = generate_correlation_id();
        let kind = request.kind();
        let start = Instant::now();

        info!(
            correlation_id = %correlation_id,
            kind = %kind,
            "Fetching from catalog"
        );

        let result = match request {
            CatalogRequest::Subjects { term, .. } => {
                self.fetch_search_page(term.as_ref(), &correlation_id).await
            }
            CatalogRequest::SectionDetail { class_number, term } => {
                self.fetch_section_page(class_number, term, &correlation_id)
                    .await
            }
            CatalogRequest::Courses {
                subject,
                campus,
                term,
            } => {
                let form = search_form(subject, "", campus, term.as_ref());
                self.class_search(form, &correlation_id).await
            }
            CatalogRequest::CourseDetail {
                course,
                campus,
                term,
            }
            | CatalogRequest::Sections {
                course,
                campus,
                term,
            } => {
                let form = search_form(
                    &course.subject_code,
                    &course.course_number,
                    campus,
                    term.as_ref(),
                );
                self.class_search(form, &correlation_id).await
            }
        };

        match &result {
            Ok(body) => info!(
                correlation_id = %correlation_id,
                kind = %kind,
                status = body.status,
                bytes = body.body.len(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Catalog request completed"
            ),
            Err(e) => error!(
                correlation_id = %correlation_id,
                kind = %kind,
                error = %e,
                duration_ms = start.elapsed().as_millis() as u64,
                "Catalog request failed"
            ),
        }

        result
    }

    /// GET classSearch, which also carries the embedded subject table.
    async fn fetch_search_page(
        &self,
        term: Option<&Term>,
        correlation_id: &str,
    ) -> Result<RawBody, CatalogError> {
        let url = self.search_page_url(term)?;
        let response = self.get(url.as_str(), correlation_id).await?;
        read_body(response).await
    }

    async fn fetch_section_page(
        &self,
        class_number: &str,
        term: &Term,
        correlation_id: &str,
    ) -> Result<RawBody, CatalogError> {
        let url = format!(
            "{}{}/{}/{}/{}",
            self.base_url, SECTION_DETAIL_PATH, self.institution, term, class_number
        );
        let response = self.get(&url, correlation_id).await?;
        read_body(response).await
    }

    /// Runs a class search: fetch a CSRF token, then post the search form.
    async fn class_search(
        &self,
        mut form: Vec<(&'static str, String)>,
        correlation_id: &str,
    ) -> Result<RawBody, CatalogError> {
        let token = self.fetch_csrf_token(correlation_id).await?;
        form.insert(0, ("CSRFToken", token.clone()));

        let url = format!("{}{}", self.base_url, CLASS_SEARCH_API_PATH);
        debug!(
            correlation_id = %correlation_id,
            url = %url,
            "Posting class search"
        );

        let response = self
            .client
            .post(&url)
            .header(COOKIE, format!("{CSRF_COOKIE}={token}"))
            .form(&form)
            .send()
            .await?;

        read_body(check_status(response)?).await
    }

    /// Loads the search form and pulls the CSRF token out of its cookie, or
    /// out of the hidden form field when the cookie is missing.
    async fn fetch_csrf_token(&self, correlation_id: &str) -> Result<String, CatalogError> {
        let url = self.search_page_url(None)?;
        let response = self.get(url.as_str(), correlation_id).await?;

        let from_cookie = response
            .cookies()
            .find(|c| c.name() == CSRF_COOKIE)
            .map(|c| c.value().to_string());
        if let Some(token) = from_cookie {
            return Ok(token);
        }

        let html = response.text().await?;
        match csrf_token_from_form(&html) {
            Some(token) => {
                debug!(
                    correlation_id = %correlation_id,
                    "CSRF cookie missing, using hidden form token"
                );
                Ok(token)
            }
            None => {
                warn!(
                    correlation_id = %correlation_id,
                    "Search page carried no CSRF token"
                );
                Err(CatalogError::upstream("search page carried no CSRF token"))
            }
        }
    }

    async fn get(&self, url: &str, correlation_id: &str) -> Result<Response, CatalogError> {
        debug!(
            correlation_id = %correlation_id,
            url = %url,
            "GET"
        );
        let response = self.client.get(url).send().await?;
        check_status(response)
    }

    fn search_page_url(&self, term: Option<&Term>) -> Result<Url, CatalogError> {
        let url = format!("{}{}", self.base_url, CLASS_SEARCH_PATH);
        Ok(match term {
            Some(term) => Url::parse_with_params(&url, &[("term", term.as_str())])?,
            None => Url::parse(&url)?,
        })
    }
}

/// Turns a non-success status into `UpstreamError`.
fn check_status(response: Response) -> Result<Response, CatalogError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(CatalogError::UpstreamError {
        status: Some(status.as_u16()),
        message: format!(
            "{} returned {}",
            response.url().path(),
            status.canonical_reason().unwrap_or("an error status")
        ),
    })
}

async fn read_body(response: Response) -> Result<RawBody, CatalogError> {
    let status = response.status().as_u16();
    let url = response.url().to_string();
    let body = response.text().await?;
    Ok(RawBody { status, url, body })
}

fn csrf_token_from_form(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&CSRF_INPUT_SELECTOR)
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Generates a unique correlation ID for request tracing.
fn generate_correlation_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros();
    let random: u32 = rand::thread_rng().gen();
    format!("{:x}-{:08x}", timestamp & 0xFFFFFFFF, random)
}
