//! Configuration loader and validator for the publish service.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub database: Database,
    pub storage: Storage,
    pub catalog: Catalog,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    /// Path segment published pages live under, e.g. `hacks`.
    pub namespace: String,
    /// Hostname of this service, used for remix links.
    pub hostname: String,
    pub poll_interval_ms: u64,
    pub max_backoff_seconds: u64,
    pub http_timeout_seconds: u64,
}

/// Project database settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Database {
    pub url: String,
}

/// Object store settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Storage {
    pub endpoint: String,
    pub bucket: String,
    pub token: String,
    /// Domain for per-user vanity URLs; absent means storage URLs are the
    /// URLs of record.
    #[serde(default)]
    pub custom_domain: Option<String>,
}

/// Page catalog API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Catalog {
    pub endpoint: String,
    pub token: String,
}

/// The slice of configuration the publish pipeline itself needs. Storage
/// credentials stay with the object-store client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishConfig {
    pub namespace: String,
    pub hostname: String,
    pub custom_domain: Option<String>,
}

impl Config {
    pub fn publish_config(&self) -> PublishConfig {
        PublishConfig {
            namespace: self.app.namespace.clone(),
            hostname: self.app.hostname.clone(),
            custom_domain: self.storage.custom_domain.clone(),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.app.http_timeout_seconds)
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
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.namespace.trim().is_empty() {
        return Err(ConfigError::Invalid("app.namespace must be non-empty"));
    }
    if cfg.app.namespace.contains('/') {
        return Err(ConfigError::Invalid("app.namespace must not contain '/'"));
    }
    if cfg.app.hostname.trim().is_empty() {
        return Err(ConfigError::Invalid("app.hostname must be non-empty"));
    }
    if cfg.app.poll_interval_ms == 0 {
        return Err(ConfigError::Invalid("app.poll_interval_ms must be > 0"));
    }
    if cfg.app.http_timeout_seconds == 0 {
        return Err(ConfigError::Invalid("app.http_timeout_seconds must be > 0"));
    }

    if cfg.database.url.trim().is_empty() {
        return Err(ConfigError::Invalid("database.url must be non-empty"));
    }

    if cfg.storage.endpoint.trim().is_empty() {
        return Err(ConfigError::Invalid("storage.endpoint must be non-empty"));
    }
    if cfg.storage.bucket.trim().is_empty() {
        return Err(ConfigError::Invalid("storage.bucket must be non-empty"));
    }
    if cfg.storage.token.trim().is_empty() {
        return Err(ConfigError::Invalid("storage.token must be non-empty"));
    }

    if cfg.catalog.endpoint.trim().is_empty() {
        return Err(ConfigError::Invalid("catalog.endpoint must be non-empty"));
    }
    if cfg.catalog.token.trim().is_empty() {
        return Err(ConfigError::Invalid("catalog.token must be non-empty"));
    }

    Ok(())
}

/// Example YAML configuration, kept in sync with `config.yaml`.
pub fn example() -> &'static str {
    r#"app:
  namespace: "hacks"
  hostname: "pages.example.com"
  poll_interval_ms: 500
  max_backoff_seconds: 60
  http_timeout_seconds: 30

database:
  url: "sqlite://data/publish.db"

storage:
  endpoint: "https://objects.example.com"
  bucket: "pages"
  token: "YOUR_STORAGE_TOKEN"
  custom_domain: "pages.example.com"

catalog:
  endpoint: "https://catalog.example.com/api"
  token: "YOUR_CATALOG_TOKEN"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.app.namespace, "hacks");
        assert_eq!(cfg.storage.custom_domain.as_deref(), Some("pages.example.com"));
    }

    #[test]
    fn custom_domain_is_optional() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.storage.custom_domain = None;
        validate(&cfg).unwrap();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let back: Config = serde_yaml::from_str(&yaml).unwrap();
        assert!(back.storage.custom_domain.is_none());
    }

    #[test]
    fn invalid_namespace() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.namespace = "".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("app.namespace")),
            _ => panic!("wrong error"),
        }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.namespace = "ha/cks".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn invalid_storage_settings() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.storage.endpoint = "".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("storage.endpoint")),
            _ => panic!("wrong error"),
        }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.storage.bucket = "".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.storage.token = "".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn invalid_catalog_settings() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.catalog.endpoint = "".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("catalog.endpoint")),
            _ => panic!("wrong error"),
        }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.catalog.token = "".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn publish_config_slices_the_right_fields() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        let pc = cfg.publish_config();
        assert_eq!(pc.namespace, "hacks");
        assert_eq!(pc.hostname, "pages.example.com");
        assert_eq!(pc.custom_domain.as_deref(), Some("pages.example.com"));
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        let mut f = fs::File::create(&p).unwrap();
        f.write_all(example().as_bytes()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.catalog.endpoint, "https://catalog.example.com/api");
        assert_eq!(cfg.http_timeout(), Duration::from_secs(30));
    }
}
