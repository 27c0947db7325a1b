/// Process-wide configuration for the catalog bot
use super::error::CatalogError;
use super::types::{Campus, Term};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Base URL of the PeopleSoft mobile catalog.
pub const PSMOBILE_BASE_URL: &str = "https://psmobile.pitt.edu/app/catalog";

/// Top-level configuration, fixed at start-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Base URL for the mobile catalog (no trailing slash)
    pub base_url: String,
    /// Institution code used in section URLs
    pub institution: String,
    /// Campus used when a command doesn't name one
    pub default_campus: Campus,
    /// Term used when a command doesn't name one; derived from today's date if unset
    pub current_term: Option<Term>,
    /// Total time allowed for a single request
    pub timeout_secs: u64,
    /// Time allowed to establish a connection
    pub connect_timeout_secs: u64,
    /// User agent string
    pub user_agent: String,
    /// Prefix that marks a chat message as a bot command
    pub command_prefix: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: PSMOBILE_BASE_URL.to_string(),
            institution: "UPITT".to_string(),
            default_campus: Campus::main(),
            current_term: None,
            timeout_secs: 8,
            connect_timeout_secs: 5,
            user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1".to_string(),
            command_prefix: "?".to_string(),
        }
    }
}

impl CatalogConfig {
    /// Loads the config from an optional JSON file, then applies `PSMOBILE_*`
    /// environment overrides.
    ///
    /// # Arguments
    /// * `path` - Config file; defaults are used when `None`
    ///
    /// # Returns
    /// * `Ok(CatalogConfig)` - The validated configuration
    /// * `Err(CatalogError::Config)` - If the file or an override is invalid
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path).map_err(|e| CatalogError::Config {
            message: format!("couldn't read {}: {e}", path.display()),
        })?;
        serde_json::from_str(&content).map_err(|e| CatalogError::Config {
            message: format!("couldn't parse {}: {e}", path.display()),
        })
    }

    /// Applies overrides looked up through `var` (the environment, in production).
    pub fn apply_overrides<F>(&mut self, var: F) -> Result<(), CatalogError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let invalid = |key: &str, err: CatalogError| CatalogError::Config {
            message: format!("{key}: {err}"),
        };

        if let Some(url) = var("PSMOBILE_BASE_URL") {
            self.base_url = url;
        }
        if let Some(term) = var("PSMOBILE_TERM") {
            self.current_term =
                Some(Term::parse(&term).map_err(|e| invalid("PSMOBILE_TERM", e))?);
        }
        if let Some(campus) = var("PSMOBILE_CAMPUS") {
            self.default_campus =
                Campus::parse(&campus).map_err(|e| invalid("PSMOBILE_CAMPUS", e))?;
        }
        if let Some(secs) = var("PSMOBILE_TIMEOUT_SECS") {
            self.timeout_secs = secs.trim().parse().map_err(|_| CatalogError::Config {
                message: format!("PSMOBILE_TIMEOUT_SECS: `{secs}` isn't a number of seconds"),
            })?;
        }
        if let Some(prefix) = var("PSMOBILE_PREFIX") {
            self.command_prefix = prefix;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<(), CatalogError> {
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        url::Url::parse(&self.base_url)?;
        if self.timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(CatalogError::Config {
                message: "timeouts must be at least one second".to_string(),
            });
        }
        if self.command_prefix.is_empty() {
            return Err(CatalogError::Config {
                message: "command prefix can't be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CatalogConfig::default();
        assert_eq!(config.default_campus.code(), "PIT");
        assert_eq!(config.current_term, None);
        assert_eq!(config.timeout(), Duration::from_secs(8));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: CatalogConfig =
            serde_json::from_str(r#"{ "current_term": "2254", "default_campus": "greensburg" }"#)
                .unwrap();
        assert_eq!(config.current_term.unwrap().as_str(), "2254");
        assert_eq!(config.default_campus.code(), "UPG");
        assert_eq!(config.base_url, PSMOBILE_BASE_URL);
    }

    #[test]
    fn test_bad_term_in_json_is_rejected() {
        assert!(serde_json::from_str::<CatalogConfig>(r#"{ "current_term": "spring" }"#).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = CatalogConfig::default();
        config
            .apply_overrides(vars(&[
                ("PSMOBILE_TERM", "2257"),
                ("PSMOBILE_CAMPUS", "UPB"),
                ("PSMOBILE_TIMEOUT_SECS", "3"),
                ("PSMOBILE_BASE_URL", "http://127.0.0.1:9000/app/catalog/"),
            ]))
            .unwrap();
        config.validate().unwrap();

        assert_eq!(config.current_term.unwrap().as_str(), "2257");
        assert_eq!(config.default_campus.code(), "UPB");
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.base_url, "http://127.0.0.1:9000/app/catalog");
    }

    #[test]
    fn test_invalid_override_is_config_error() {
        let mut config = CatalogConfig::default();
        let err = config
            .apply_overrides(vars(&[("PSMOBILE_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Config { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = CatalogConfig {
            timeout_secs: 0,
            ..CatalogConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
