//! # Configuration
//!
//! Where the database lives, how long rule snapshots are cached, and which
//! roles legacy rules are backfilled with.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     IPQ_DATABASE_PATH=/var/lib/ipq/ipq.db                              │
//! │     IPQ_RULE_CACHE_TTL_SECS=600                                        │
//! │     IPQ_KNOWN_ROLES=customer,wholesale                                 │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/ipq/ipq.toml (Linux)                                     │
//! │     ~/Library/Application Support/com.ipq.ipq/ipq.toml (macOS)         │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "ipq.db"
//! max_connections = 5
//!
//! [cache]
//! rule_ttl_secs = 43200
//!
//! [roles]
//! known = ["administrator", "editor", "customer", "shop_manager"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::pool::DbConfig;
use ipq_core::RULE_CACHE_TTL_SECS;

// =============================================================================
// Errors
// =============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config file: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    InvalidValue(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("ipq.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Lifetime of a per-role rule snapshot.
    #[serde(default = "default_rule_ttl")]
    pub rule_ttl_secs: u64,
}

fn default_rule_ttl() -> u64 {
    RULE_CACHE_TTL_SECS
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            rule_ttl_secs: default_rule_ttl(),
        }
    }
}

/// `[roles]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSettings {
    /// Roles assigned to published rules that have none.
    #[serde(default = "default_known_roles")]
    pub known: Vec<String>,
}

fn default_known_roles() -> Vec<String> {
    [
        "administrator",
        "editor",
        "author",
        "contributor",
        "subscriber",
        "customer",
        "shop_manager",
    ]
    .iter()
    .map(|role| role.to_string())
    .collect()
}

impl Default for RoleSettings {
    fn default() -> Self {
        RoleSettings {
            known: default_known_roles(),
        }
    }
}

// =============================================================================
// IpqConfig
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpqConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub roles: RoleSettings,
}

impl IpqConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`ipq.toml`), when it exists
    /// 3. `IPQ_*` environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns the defaults if loading fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a TOML document; missing sections take their defaults.
    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Writes the configuration as TOML, creating parent directories.
    pub fn save(&self, path: &std::path::Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, toml::to_string_pretty(self)?)?;

        info!(?path, "Config saved");
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.roles.known.iter().any(|role| role.trim().is_empty()) {
            return Err(ConfigError::InvalidValue(
                "roles.known must not contain blank roles".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Applies `IPQ_*` overrides looked up through `lookup`.
    ///
    /// Unparsable numbers are ignored with a warning.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("IPQ_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("IPQ_MAX_CONNECTIONS") {
            match max.trim().parse::<u32>() {
                Ok(max) => self.database.max_connections = max,
                Err(_) => warn!(value = %max, "Ignoring invalid IPQ_MAX_CONNECTIONS"),
            }
        }

        if let Some(ttl) = lookup("IPQ_RULE_CACHE_TTL_SECS") {
            match ttl.trim().parse::<u64>() {
                Ok(ttl) => {
                    debug!(ttl, "Overriding rule cache TTL from environment");
                    self.cache.rule_ttl_secs = ttl;
                }
                Err(_) => warn!(value = %ttl, "Ignoring invalid IPQ_RULE_CACHE_TTL_SECS"),
            }
        }

        if let Some(roles) = lookup("IPQ_KNOWN_ROLES") {
            self.roles.known = roles
                .split(',')
                .map(str::trim)
                .filter(|role| !role.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    /// Platform config file location.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "ipq", "ipq")
            .map(|dirs| dirs.config_dir().join("ipq.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn rule_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.rule_ttl_secs)
    }

    pub fn to_db_config(&self) -> DbConfig {
        if self.database.path == std::path::Path::new(":memory:") {
            return DbConfig::in_memory();
        }

        DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = IpqConfig::default();
        assert_eq!(config.database.path, PathBuf::from("ipq.db"));
        assert_eq!(config.rule_cache_ttl(), Duration::from_secs(43_200));
        assert!(config.roles.known.contains(&"customer".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = IpqConfig::from_toml(
            r#"
            [cache]
            rule_ttl_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.cache.rule_ttl_secs, 60);
        assert_eq!(config.database, DatabaseSettings::default());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            IpqConfig::from_toml("[cache]\nrule_ttl_secs = \"soon\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = IpqConfig::default();
        config.apply_overrides(env(&[
            ("IPQ_DATABASE_PATH", "/srv/ipq/store.db"),
            ("IPQ_RULE_CACHE_TTL_SECS", "600"),
            ("IPQ_KNOWN_ROLES", "customer, wholesale,,"),
            ("IPQ_MAX_CONNECTIONS", "lots"),
        ]));

        assert_eq!(config.database.path, PathBuf::from("/srv/ipq/store.db"));
        assert_eq!(config.cache.rule_ttl_secs, 600);
        assert_eq!(config.roles.known, vec!["customer", "wholesale"]);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_validation() {
        let mut config = IpqConfig::default();
        config.database.max_connections = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));

        let mut config = IpqConfig::default();
        config.roles.known.push("  ".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file_and_save() {
        let path = std::env::temp_dir()
            .join(format!("ipq-config-test-{}", std::process::id()))
            .join("ipq.toml");

        let mut config = IpqConfig::default();
        config.database.path = PathBuf::from(":memory:");
        config.cache.rule_ttl_secs = 5;
        config.save(&path).unwrap();

        let loaded = IpqConfig::from_toml(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, config);
        assert!(loaded.to_db_config().is_in_memory());

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("ipq-config-does-not-exist.toml");
        let config = IpqConfig::load_or_default(Some(path));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_to_db_config() {
        let mut config = IpqConfig::default();
        config.database.max_connections = 3;
        let db = config.to_db_config();
        assert_eq!(db.database_path, PathBuf::from("ipq.db"));
        assert_eq!(db.max_connections, 3);
    }
}
