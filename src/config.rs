//! Configuration loader and validator for the back-office work queue.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::projector::SearchFields;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub backend: Backend,
    #[serde(default)]
    pub executor: Executor,
    pub search: Search,
}

/// Admin API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Backend {
    pub base_url: String,
    /// Bearer token; empty means unauthenticated.
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Bulk action fan-out settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Executor {
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

impl Default for Executor {
    fn default() -> Self {
        Self {
            call_timeout_ms: default_call_timeout_ms(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

/// Attributes the filter/search projector reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Search {
    pub fields: Vec<String>,
    #[serde(default = "default_category_field")]
    pub category_field: String,
}

fn default_user_agent() -> String {
    "backoffice-queue/0.1".into()
}

fn default_call_timeout_ms() -> u64 {
    30_000
}

fn default_max_in_flight() -> usize {
    8
}

fn default_category_field() -> String {
    "category".into()
}

impl Config {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.executor.call_timeout_ms)
    }

    pub fn search_fields(&self) -> SearchFields {
        SearchFields::new(&self.search.fields, &self.search.category_field)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.backend.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("backend.base_url must be non-empty"));
    }
    if cfg.backend.user_agent.trim().is_empty() {
        return Err(ConfigError::Invalid("backend.user_agent must be non-empty"));
    }

    if cfg.executor.call_timeout_ms == 0 {
        return Err(ConfigError::Invalid("executor.call_timeout_ms must be > 0"));
    }
    if cfg.executor.max_in_flight == 0 {
        return Err(ConfigError::Invalid("executor.max_in_flight must be > 0"));
    }

    if cfg.search.fields.is_empty() {
        return Err(ConfigError::Invalid("search.fields must list at least one attribute"));
    }
    if cfg.search.fields.iter().any(|f| f.trim().is_empty()) {
        return Err(ConfigError::Invalid("search.fields entries must be non-empty"));
    }
    if cfg.search.category_field.trim().is_empty() {
        return Err(ConfigError::Invalid("search.category_field must be non-empty"));
    }

    Ok(())
}

/// Example configuration document.
pub fn example() -> &'static str {
    r#"backend:
  base_url: "https://admin.example.com/api/"
  token: "YOUR_ADMIN_API_TOKEN"

executor:
  call_timeout_ms: 30000
  max_in_flight: 8

search:
  fields:
    - title
    - description
    - counterpart
  category_field: category
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.call_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.backend.user_agent, "backoffice-queue/0.1");
        assert_eq!(cfg.search_fields().text.len(), 3);
    }

    #[test]
    fn executor_section_is_optional() {
        let cfg: Config = serde_yaml::from_str(
            r#"backend:
  base_url: "http://localhost:8080/"
search:
  fields: [title]
"#,
        )
        .unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.executor, Executor::default());
        assert_eq!(cfg.backend.token, "");
        assert_eq!(cfg.search.category_field, "category");
    }

    #[test]
    fn invalid_base_url() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.backend.base_url = " ".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("backend.base_url")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn invalid_executor_limits() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.executor.call_timeout_ms = 0;
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("call_timeout_ms")),
            _ => panic!("wrong error"),
        }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.executor.max_in_flight = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn invalid_search_fields() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.search.fields.clear();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.search.fields.push("".into());
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.search.category_field = "".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.search.fields, vec!["title", "description", "counterpart"]);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let td = tempdir().unwrap();
        let err = load(Some(&td.path().join("absent.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
