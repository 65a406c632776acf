/*!
 * Configuration types for Keystone
 */

use crate::error::{KeystoneError, Result};
use chrono::Duration;
use keystone_core_manifest::{KindInfo, ManifestKind, Registry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Main configuration for repository operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeystoneConfig {
    /// Directory holding the published manifests
    #[serde(default = "default_repo_dir")]
    pub repo_dir: PathBuf,

    /// Directory holding private signing keys
    #[serde(default = "default_keys_dir")]
    pub keys_dir: PathBuf,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stdout)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,

    /// Per-kind overrides of the standard registry, keyed by kind name
    #[serde(default)]
    pub roles: BTreeMap<String, RoleOverride>,
}

/// Override of one registry entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleOverride {
    /// Lifetime in days
    #[serde(default)]
    pub expire_days: Option<i64>,

    /// Minimum number of signatures
    #[serde(default)]
    pub threshold: Option<u32>,
}

impl Default for KeystoneConfig {
    fn default() -> Self {
        Self {
            repo_dir: default_repo_dir(),
            keys_dir: default_keys_dir(),
            log_level: LogLevel::Info,
            log_file: None,
            verbose: false,
            roles: BTreeMap::new(),
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

// Default value functions for serde
fn default_repo_dir() -> PathBuf {
    PathBuf::from("repo")
}

fn default_keys_dir() -> PathBuf {
    PathBuf::from("keys")
}

impl KeystoneConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: KeystoneConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Load `path` if given, else the default location if it exists, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// The standard registry with this configuration's overrides applied
    pub fn registry(&self) -> Result<Registry> {
        let mut registry = Registry::standard().clone();
        for (name, role) in &self.roles {
            let kind: ManifestKind = name
                .parse()
                .map_err(|_| KeystoneError::Config(format!("Unknown role '{}'", name)))?;
            let current = registry.info(kind)?.clone();
            let expire = match role.expire_days {
                Some(days) if days <= 0 => {
                    return Err(KeystoneError::Config(format!(
                        "expire_days for '{}' must be positive",
                        name
                    )))
                }
                Some(days) => Duration::try_days(days).ok_or_else(|| {
                    KeystoneError::Config(format!(
                        "expire_days for '{}' is out of range: {}",
                        name, days
                    ))
                })?,
                None => current.expire,
            };
            let threshold = role.threshold.unwrap_or(current.threshold);
            registry = registry.with(kind, KindInfo::new(current.filename, expire, threshold))?;
        }
        Ok(registry)
    }
}

/// `~/.keystone/keystone.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".keystone").join("keystone.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = KeystoneConfig::default();
        assert_eq!(config.repo_dir, PathBuf::from("repo"));
        assert_eq!(config.keys_dir, PathBuf::from("keys"));
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.roles.is_empty());
    }

    #[test]
    fn test_serialization() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("keystone.toml");
        let mut config = KeystoneConfig::default();
        config.roles.insert(
            "timestamp".to_string(),
            RoleOverride {
                expire_days: Some(7),
                threshold: None,
            },
        );

        config.to_file(&path).unwrap();
        assert_eq!(KeystoneConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_readme_config_example() {
        let toml_str = r#"
repo_dir = "/srv/keystone/repo"
keys_dir = "/srv/keystone/keys"
log_level = "debug"

[roles.timestamp]
expire_days = 7

[roles.index]
threshold = 2
"#;

        let config: KeystoneConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.repo_dir, PathBuf::from("/srv/keystone/repo"));
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.roles.len(), 2);

        let registry = config.registry().unwrap();
        assert_eq!(
            registry.info(ManifestKind::Timestamp).unwrap().expire,
            Duration::days(7)
        );
        assert_eq!(registry.threshold(ManifestKind::Index).unwrap(), 2);
        assert_eq!(registry.filename(ManifestKind::Index).unwrap(), "index.json");
        assert_eq!(registry.threshold(ManifestKind::Root).unwrap(), 1);
    }

    #[test]
    fn test_unknown_role_rejected() {
        let mut config = KeystoneConfig::default();
        config
            .roles
            .insert("mirrors".to_string(), RoleOverride::default());
        assert!(matches!(config.registry(), Err(KeystoneError::Config(_))));
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let mut config = KeystoneConfig::default();
        config.roles.insert(
            "root".to_string(),
            RoleOverride {
                expire_days: None,
                threshold: Some(0),
            },
        );
        assert!(matches!(config.registry(), Err(KeystoneError::Manifest(_))));
    }

    #[test]
    fn test_huge_expire_days_rejected() {
        let mut config = KeystoneConfig::default();
        config.roles.insert(
            "index".to_string(),
            RoleOverride {
                expire_days: Some(i64::MAX),
                threshold: None,
            },
        );
        assert!(matches!(config.registry(), Err(KeystoneError::Config(_))));
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(LogLevel::Error.to_tracing_level(), tracing::Level::ERROR);
        assert_eq!(LogLevel::Debug.to_tracing_level(), tracing::Level::DEBUG);
    }
}
