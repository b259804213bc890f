// ⚙️ Configuration - config.toml with ENV:NAME resolution
//
// Any string value "ENV:NAME" is replaced by the environment variable NAME.
// An unset variable removes the key, so the field takes its default.

use crate::normalize::NormalizedCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const ENV_PREFIX: &str = "ENV:";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    /// Only rows under `tracked_hts` prefixes are kept
    #[default]
    TrackedOnly,
    FullTable,
}

impl TrackingMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "tracked_only" => Some(TrackingMode::TrackedOnly),
            "full_table" => Some(TrackingMode::FullTable),
            _ => None,
        }
    }
}

impl fmt::Display for TrackingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingMode::TrackedOnly => f.write_str("tracked_only"),
            TrackingMode::FullTable => f.write_str("full_table"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourcesConfig {
    /// Producer CSV imported by `run`
    #[serde(default = "default_export_path")]
    pub hts_export_path: PathBuf,

    #[serde(default)]
    pub name: Option<String>,
}

fn default_export_path() -> PathBuf {
    PathBuf::from("data/hts_current.csv")
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            hts_export_path: default_export_path(),
            name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_snapshots_dir")]
    pub snapshots_dir: PathBuf,

    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default = "default_retain_weeks")]
    pub retain_weeks: u32,
}

fn default_snapshots_dir() -> PathBuf {
    PathBuf::from("snapshots")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("tariff_watch.db")
}

fn default_retain_weeks() -> u32 {
    12
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshots_dir: default_snapshots_dir(),
            database_path: default_database_path(),
            retain_weeks: default_retain_weeks(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// File layout before validation
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    tracked_hts: Vec<String>,
    #[serde(default)]
    sources: SourcesConfig,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    pub mode: TrackingMode,
    pub tracked_hts: Vec<NormalizedCode>,
    pub sources: SourcesConfig,
    pub storage: StorageConfig,
    pub runtime: RuntimeConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, |name| std::env::var(name).ok())
    }

    /// Parse config text, resolving ENV: references through `env`
    pub fn from_toml_str<F>(text: &str, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let table: toml::Table = toml::from_str(text)?;
        let mut value = toml::Value::Table(table);
        resolve_env(&mut value, &env);
        let raw: RawConfig = value.try_into()?;
        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> Result<Self, ConfigError> {
        let mode = match raw.mode.as_deref() {
            None => TrackingMode::default(),
            Some(s) => TrackingMode::parse(s)
                .ok_or_else(|| ConfigError::Invalid(format!("unknown mode: {:?}", s)))?,
        };

        let tracked_hts = raw
            .tracked_hts
            .iter()
            .map(|entry| {
                NormalizedCode::parse(entry).ok_or_else(|| {
                    ConfigError::Invalid(format!("tracked_hts entry {:?} is not an HTS code", entry))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if raw.storage.retain_weeks < 1 {
            return Err(ConfigError::Invalid("storage.retain_weeks must be >= 1".to_string()));
        }

        Ok(AppConfig {
            mode,
            tracked_hts,
            sources: raw.sources,
            storage: raw.storage,
            runtime: raw.runtime,
        })
    }

    /// Level for the tracing subscriber; unknown names fall back to INFO
    pub fn log_level(&self) -> tracing::Level {
        parse_level(&self.runtime.log_level)
    }
}

pub fn parse_level(name: &str) -> tracing::Level {
    name.trim()
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO)
}

/// Replace ENV:NAME strings in place; unset variables drop the key or element
fn resolve_env<F>(value: &mut toml::Value, env: &F)
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        toml::Value::Table(table) => {
            let keys: Vec<String> = table.keys().cloned().collect();
            for key in keys {
                let resolved = match table.get_mut(&key) {
                    Some(toml::Value::String(s)) => s.strip_prefix(ENV_PREFIX).map(|name| env(name)),
                    Some(other) => {
                        resolve_env(other, env);
                        None
                    }
                    None => None,
                };
                match resolved {
                    Some(Some(v)) => {
                        table.insert(key, toml::Value::String(v));
                    }
                    Some(None) => {
                        debug!(key = %key, "environment variable not set; using default");
                        table.remove(&key);
                    }
                    None => {}
                }
            }
        }
        toml::Value::Array(items) => {
            let mut resolved = Vec::with_capacity(items.len());
            for mut item in items.drain(..) {
                let env_name = match &item {
                    toml::Value::String(s) => s.strip_prefix(ENV_PREFIX).map(str::to_string),
                    _ => None,
                };
                match env_name {
                    Some(name) => {
                        if let Some(v) = env(&name) {
                            resolved.push(toml::Value::String(v));
                        }
                    }
                    None => {
                        resolve_env(&mut item, env);
                        resolved.push(item);
                    }
                }
            }
            *items = resolved;
        }
        _ => {}
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_from_empty_file() {
        let cfg = AppConfig::from_toml_str("", no_env).unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.storage.retain_weeks, 12);
        assert_eq!(cfg.mode, TrackingMode::TrackedOnly);
    }

    #[test]
    fn test_full_file() {
        let text = r#"
            mode = "full_table"
            tracked_hts = ["8471.30", "7604"]

            [sources]
            hts_export_path = "exports/hts.csv"
            name = "USITC HTS export"

            [storage]
            snapshots_dir = "snaps"
            database_path = "db/history.db"
            retain_weeks = 4

            [runtime]
            log_level = "debug"
        "#;
        let cfg = AppConfig::from_toml_str(text, no_env).unwrap();
        assert_eq!(cfg.mode, TrackingMode::FullTable);
        assert_eq!(cfg.tracked_hts[0].as_str(), "847130");
        assert_eq!(cfg.sources.hts_export_path, PathBuf::from("exports/hts.csv"));
        assert_eq!(cfg.storage.retain_weeks, 4);
        assert_eq!(cfg.log_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_env_resolution() {
        let text = r#"
            tracked_hts = ["ENV:EXTRA_CODE", "ENV:UNSET_CODE", "7604"]
            [storage]
            database_path = "ENV:TW_DB"
            snapshots_dir = "ENV:TW_UNSET"
        "#;
        let env = |name: &str| match name {
            "TW_DB" => Some("/var/lib/tw.db".to_string()),
            "EXTRA_CODE" => Some("9503".to_string()),
            _ => None,
        };
        let cfg = AppConfig::from_toml_str(text, env).unwrap();
        assert_eq!(cfg.storage.database_path, PathBuf::from("/var/lib/tw.db"));
        assert_eq!(cfg.storage.snapshots_dir, PathBuf::from("snapshots"));
        let tracked: Vec<&str> = cfg.tracked_hts.iter().map(|c| c.as_str()).collect();
        assert_eq!(tracked, vec!["9503", "7604"]);
    }

    #[test]
    fn test_blank_tracked_entry_rejected() {
        let err = AppConfig::from_toml_str(r#"tracked_hts = ["7604", " "]"#, no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_zero_retention_rejected() {
        let err = AppConfig::from_toml_str("[storage]\nretain_weeks = 0", no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let err = AppConfig::from_toml_str(r#"mode = "everything""#, no_env).unwrap_err();
        assert!(err.to_string().contains("unknown mode"));
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let err = AppConfig::from_toml_str("mode = ", no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::load(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_unknown_log_level_falls_back() {
        assert_eq!(parse_level("loud"), tracing::Level::INFO);
        assert_eq!(parse_level("WARN"), tracing::Level::WARN);
    }
}
