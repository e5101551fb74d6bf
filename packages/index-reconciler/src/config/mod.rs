//! Configuration
//!
//! Two layers:
//! - `ReconcileConfig`: knobs of the reconciliation engine itself
//! - `BootConfig`: what the boot binary needs to reach the database
//!
//! The desired-state table is never configured here; it is compiled in.
//!
//! # Examples
//!
//! ```rust,ignore
//! use index_reconciler::config::BootConfig;
//!
//! // file → env → CLI flags
//! let mut config = BootConfig::from_yaml("reconcile.yaml")?;
//! config.apply_env_overrides();
//! config.validate()?;
//! ```

pub mod error;

pub use error::{ConfigError, ConfigResult};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Supported YAML schema versions
pub const SUPPORTED_VERSIONS: &[u32] = &[1];

pub const ENV_MONGO_URI: &str = "INDEX_RECONCILE_MONGO_URI";
pub const ENV_DATABASE: &str = "INDEX_RECONCILE_DATABASE";
pub const ENV_LOG_LEVEL: &str = "INDEX_RECONCILE_LOG_LEVEL";

/// What to do when listing a collection's indexes fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingPolicy {
    /// Treat the collection as having no indexes and go down the create path
    #[default]
    FailOpen,
    /// Record the desired index as failed without touching the collection
    FailClosed,
}

impl ListingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FailOpen => "fail_open",
            Self::FailClosed => "fail_closed",
        }
    }
}

impl std::fmt::Display for ListingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcileConfig {
    pub listing_policy: ListingPolicy,
    /// Check the desired-state table before any database call
    pub validate_desired_state: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            listing_policy: ListingPolicy::FailOpen,
            validate_desired_state: true,
        }
    }
}

impl ReconcileConfig {
    pub fn with_listing_policy(mut self, policy: ListingPolicy) -> Self {
        self.listing_policy = policy;
        self
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate_desired_state = validate;
        self
    }
}

/// Boot binary settings (YAML schema v1)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BootConfig {
    /// Schema version (always 1 for v1)
    pub version: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mongo_uri: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Upper bound for the whole reconciliation run
    #[serde(default = "default_boot_timeout_secs")]
    pub boot_timeout_secs: u64,

    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_boot_timeout_secs() -> u64 {
    120
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            version: 1,
            mongo_uri: None,
            database: None,
            log_level: default_log_level(),
            boot_timeout_secs: default_boot_timeout_secs(),
            reconcile: ReconcileConfig::default(),
        }
    }
}

impl BootConfig {
    /// Load from a YAML file
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let raw: serde_yaml::Value = serde_yaml::from_str(content)?;
        let version = raw
            .get("version")
            .and_then(serde_yaml::Value::as_u64)
            .ok_or(ConfigError::MissingVersion)?;
        let version = u32::try_from(version)
            .map_err(|_| ConfigError::invalid("version", version.to_string()))?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }
        Ok(serde_yaml::from_value(raw)?)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Apply `INDEX_RECONCILE_*` environment variables
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (env-shaped keys)
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(uri) = lookup(ENV_MONGO_URI) {
            self.mongo_uri = Some(uri);
        }
        if let Some(database) = lookup(ENV_DATABASE) {
            self.database = Some(database);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        match self.mongo_uri.as_deref() {
            None | Some("") => {
                return Err(ConfigError::missing(
                    "mongo_uri",
                    format!("Set it in the config file, {} or --mongo-uri.", ENV_MONGO_URI),
                ))
            }
            Some(uri) if !uri.starts_with("mongodb://") && !uri.starts_with("mongodb+srv://") => {
                return Err(ConfigError::invalid(
                    "mongo_uri",
                    "expected a mongodb:// or mongodb+srv:// connection string",
                ))
            }
            Some(_) => {}
        }
        if self.database.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::missing(
                "database",
                format!("Set it in the config file, {} or --database.", ENV_DATABASE),
            ));
        }
        if self.boot_timeout_secs == 0 {
            return Err(ConfigError::invalid("boot_timeout_secs", "must be greater than 0"));
        }
        Ok(())
    }

    pub fn boot_timeout(&self) -> Duration {
        Duration::from_secs(self.boot_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_yaml_loading() {
        let yaml_content = r#"
version: 1
mongo_uri: mongodb://localhost:27017
database: stratahub
boot_timeout_secs: 30
reconcile:
  listing_policy: fail_closed
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml_content.as_bytes()).unwrap();

        let config = BootConfig::from_yaml(temp_file.path()).unwrap();
        assert_eq!(config.database.as_deref(), Some("stratahub"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.boot_timeout(), Duration::from_secs(30));
        assert_eq!(config.reconcile.listing_policy, ListingPolicy::FailClosed);
        assert!(config.reconcile.validate_desired_state);
        config.validate().unwrap();
    }

    #[test]
    fn test_yaml_missing_version() {
        let result = BootConfig::from_yaml_str("database: stratahub\n");
        assert!(matches!(result, Err(ConfigError::MissingVersion)));
    }

    #[test]
    fn test_yaml_unsupported_version() {
        let result = BootConfig::from_yaml_str("version: 2\n");
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::UnsupportedVersion { found: 2, .. }
        ));
    }

    #[test]
    fn test_yaml_unknown_field() {
        let result = BootConfig::from_yaml_str("version: 1\nmongo_url: mongodb://x\n");
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = BootConfig {
            mongo_uri: Some("mongodb://db:27017".to_string()),
            database: Some("app".to_string()),
            ..BootConfig::default()
        };

        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("version: 1"));
        assert!(yaml.contains("listing_policy: fail_open"));
        assert_eq!(BootConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_MONGO_URI, "mongodb://env:27017"),
            (ENV_LOG_LEVEL, "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = BootConfig {
            mongo_uri: Some("mongodb://file:27017".to_string()),
            database: Some("app".to_string()),
            ..BootConfig::default()
        };
        config.apply_overrides_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.mongo_uri.as_deref(), Some("mongodb://env:27017"));
        assert_eq!(config.database.as_deref(), Some("app"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_validate() {
        let mut config = BootConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::Missing { ref field, .. }) if field == "mongo_uri"));

        config.mongo_uri = Some("postgres://localhost".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

        config.mongo_uri = Some("mongodb://localhost".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::Missing { ref field, .. }) if field == "database"));

        config.database = Some("app".to_string());
        config.boot_timeout_secs = 0;
        assert!(config.validate().is_err());

        config.boot_timeout_secs = 5;
        config.validate().unwrap();
    }

    #[test]
    fn test_reconcile_config_defaults() {
        let config = ReconcileConfig::default()
            .with_listing_policy(ListingPolicy::FailClosed)
            .with_validation(false);
        assert_eq!(config.listing_policy.to_string(), "fail_closed");
        assert!(!config.validate_desired_state);
    }
}
