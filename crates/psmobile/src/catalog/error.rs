//! Error types for the catalog subsystem.

use thiserror::Error;

/// Errors that can occur while serving a catalog query.
///
/// Every variant is scoped to the single invocation that produced it; none of
/// them is fatal to the process.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Caller input failed validation; no network call was made
    #[error("Invalid argument `{argument}`: {message}")]
    InvalidArgument { argument: String, message: String },

    /// The catalog host could not be reached (connect failure or timeout)
    #[error("Catalog unavailable: {message}")]
    UpstreamUnavailable { message: String },

    /// The catalog host answered, but with a recognized error condition
    #[error("Catalog returned an error{}: {message}", status_suffix(.status))]
    UpstreamError {
        status: Option<u16>,
        message: String,
    },

    /// The catalog returned data the parser cannot interpret
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    /// A well-formed response with no record for a specific lookup
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// Start-up configuration could not be loaded
    #[error("Configuration error: {message}")]
    Config { message: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl CatalogError {
    pub(crate) fn invalid(argument: &str, message: impl Into<String>) -> Self {
        CatalogError::InvalidArgument {
            argument: argument.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        CatalogError::MalformedResponse {
            message: message.into(),
        }
    }

    pub(crate) fn upstream(message: impl Into<String>) -> Self {
        CatalogError::UpstreamError {
            status: None,
            message: message.into(),
        }
    }

    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        CatalogError::NotFound { what: what.into() }
    }

    /// Returns true if this error is potentially transient and a caller may
    /// retry it with backoff. Nothing in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::UpstreamUnavailable { .. })
    }

    /// A short sentence suitable for posting back to a chat channel.
    pub fn user_message(&self) -> String {
        match self {
            CatalogError::InvalidArgument { argument, message } => {
                format!("That {argument} doesn't look right: {message}.")
            }
            CatalogError::UpstreamUnavailable { .. } => {
                "The class catalog isn't responding right now. Try again in a bit.".to_string()
            }
            CatalogError::UpstreamError { .. } => {
                "The class catalog returned an error for that request.".to_string()
            }
            CatalogError::MalformedResponse { .. } => {
                "The class catalog sent back something I couldn't read.".to_string()
            }
            CatalogError::NotFound { what } => format!("Couldn't find {what}."),
            CatalogError::Config { message } => format!("Bot misconfigured: {message}"),
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return CatalogError::UpstreamError {
                status: Some(status.as_u16()),
                message: err.to_string(),
            };
        }
        if err.is_decode() {
            return CatalogError::malformed(err.to_string());
        }
        CatalogError::UpstreamUnavailable {
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for CatalogError {
    fn from(err: url::ParseError) -> Self {
        CatalogError::Config {
            message: format!("bad catalog URL: {err}"),
        }
    }
}
