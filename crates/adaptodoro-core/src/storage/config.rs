//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - The escalating stage schedule and session cutoff
//! - The host tick interval
//! - Ledger storage key and the placeholder for blank results
//!
//! Configuration is stored at `<data dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use super::database::DEFAULT_SNAPSHOT_KEY;
use crate::error::{ConfigError, Result};
use crate::ledger::DEFAULT_RESULT;
use crate::session::{EscalationSchedule, DEFAULT_CUTOFF_MINUTES, DEFAULT_STAGE_MINUTES};

/// Session-specific configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Stage lengths in minutes, shortest first.
    #[serde(default = "default_schedule")]
    pub schedule: Vec<u64>,
    #[serde(default = "default_cutoff_minutes")]
    pub cutoff_minutes: u64,
    /// How often the CLI host delivers a tick.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// Ledger-specific configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_result")]
    pub default_result: String,
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

// Default functions
fn default_schedule() -> Vec<u64> {
    DEFAULT_STAGE_MINUTES.to_vec()
}
fn default_cutoff_minutes() -> u64 {
    DEFAULT_CUTOFF_MINUTES
}
fn default_tick_interval_ms() -> u64 {
    1000
}
fn default_result() -> String {
    DEFAULT_RESULT.into()
}
fn default_storage_key() -> String {
    DEFAULT_SNAPSHOT_KEY.into()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            schedule: default_schedule(),
            cutoff_minutes: default_cutoff_minutes(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_result: default_result(),
            storage_key: default_storage_key(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?
                            .into(),
                    ),
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };
                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data dir, writing defaults if no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// All leaf keys with their current values, in dotted form.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Ok(serde_json::Value::Object(sections)) = serde_json::to_value(self) {
            for (section, fields) in sections {
                if let serde_json::Value::Object(fields) = fields {
                    for (name, value) in fields {
                        let rendered = match value {
                            serde_json::Value::String(s) => s,
                            other => other.to_string(),
                        };
                        out.push((format!("{section}.{name}"), rendered));
                    }
                }
            }
        }
        out
    }

    /// Set a config value by key. The change is rejected if it would leave
    /// the configuration invalid. Does not write to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// or fails validation.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Check the values that would otherwise break the session engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.escalation_schedule()?;
        if self.session.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "session.tick_interval_ms".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.ledger.storage_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "ledger.storage_key".into(),
                message: "must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Build the escalation schedule described by `[session]`.
    pub fn escalation_schedule(&self) -> Result<EscalationSchedule, ConfigError> {
        EscalationSchedule::new(self.session.schedule.clone(), self.session.cutoff_minutes).ok_or_else(
            || ConfigError::InvalidValue {
                key: "session.schedule".into(),
                message: "needs at least one stage, no zero-length stage and a non-zero cutoff"
                    .into(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.session.schedule, vec![5, 6, 8, 10, 12, 15]);
    }

    #[test]
    fn missing_sections_use_defaults() {
        let parsed: Config = toml::from_str("[session]\ncutoff_minutes = 30\n").unwrap();
        assert_eq!(parsed.session.cutoff_minutes, 30);
        assert_eq!(parsed.session.tick_interval_ms, 1000);
        assert_eq!(parsed.ledger.default_result, DEFAULT_RESULT);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("session.cutoff_minutes").as_deref(), Some("56"));
        assert_eq!(cfg.get("session.schedule").as_deref(), Some("[5,6,8,10,12,15]"));
        assert_eq!(cfg.get("ledger.storage_key").as_deref(), Some("pomodoroData"));
        assert!(cfg.get("session.missing_key").is_none());
    }

    #[test]
    fn set_updates_number_and_array() {
        let mut cfg = Config::default();
        cfg.set("session.cutoff_minutes", "40").unwrap();
        cfg.set("session.schedule", "[3, 4, 5]").unwrap();
        assert_eq!(cfg.session.cutoff_minutes, 40);
        assert_eq!(cfg.escalation_schedule().unwrap().stage_minutes(), &[3, 4, 5]);
    }

    #[test]
    fn set_updates_string() {
        let mut cfg = Config::default();
        cfg.set("ledger.default_result", "Done!").unwrap();
        assert_eq!(cfg.ledger.default_result, "Done!");
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(cfg.set("session.nonexistent_key", "1").is_err());
        assert!(cfg.set("", "1").is_err());
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.set("session.cutoff_minutes", "soon").is_err());
        assert!(cfg.set("session.schedule", "five").is_err());
    }

    #[test]
    fn set_rejects_invalid_schedule_and_keeps_old_value() {
        let mut cfg = Config::default();
        assert!(cfg.set("session.schedule", "[]").is_err());
        assert!(cfg.set("session.schedule", "[5, 0]").is_err());
        assert!(cfg.set("session.tick_interval_ms", "0").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn entries_list_every_leaf() {
        let keys: Vec<String> = Config::default().entries().into_iter().map(|(k, _)| k).collect();
        assert!(keys.contains(&"session.schedule".to_string()));
        assert!(keys.contains(&"ledger.default_result".to_string()));
        assert_eq!(keys.len(), 5);
    }

    #[test]
    fn load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.set("session.cutoff_minutes", "45").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().session.cutoff_minutes, 45);
    }

    #[test]
    fn load_from_rejects_broken_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "session = [").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
