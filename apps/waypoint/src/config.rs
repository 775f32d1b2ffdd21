//! # Configuration
//!
//! `WaypointConfig` is assembled in layers, later layers winning:
//!
//! 1. built-in defaults
//! 2. a TOML file (`--config`, or `waypoint.toml` in the working directory)
//! 3. environment (`WAYPOINT_STORE`, `WAYPOINT_API_KEY`, `WAYPOINT_MIRROR`,
//!    `WAYPOINT_LOG_FORMAT`)
//! 4. command-line flags

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use waypoint_core::WizardError;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "waypoint.toml";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = WizardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(WizardError::SerializationError(format!(
                "Unknown log format '{other}' (expected text or json)"
            ))),
        }
    }
}

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WaypointConfig {
    /// Authoritative store: an HTTP(S) base URL or a dataset file path.
    pub store: String,
    /// Bearer key for the HTTP store.
    pub api_key: Option<String>,
    /// Path of the redb mirror.
    pub mirror: PathBuf,
    pub log_format: LogFormat,
}

impl Default for WaypointConfig {
    fn default() -> Self {
        Self {
            store: "http://localhost:3000".to_string(),
            api_key: None,
            mirror: PathBuf::from("waypoint.redb"),
            log_format: LogFormat::Text,
        }
    }
}

impl WaypointConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml(text: &str) -> Result<Self, WizardError> {
        toml::from_str(text)
            .map_err(|e| WizardError::SerializationError(format!("Invalid config: {e}")))
    }

    /// Load the file layer.
    ///
    /// An explicit path must exist; the default file is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, WizardError> {
        let path = match explicit {
            Some(path) => path,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Path::new(DEFAULT_CONFIG_FILE),
            None => return Ok(Self::default()),
        };
        let text = std::fs::read_to_string(path).map_err(|e| {
            WizardError::IoError(format!("Cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&text)
    }

    /// Apply the environment layer through `lookup` (normally `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), WizardError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(store) = lookup("WAYPOINT_STORE") {
            self.store = store;
        }
        if let Some(key) = lookup("WAYPOINT_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(mirror) = lookup("WAYPOINT_MIRROR") {
            self.mirror = PathBuf::from(mirror);
        }
        if let Some(format) = lookup("WAYPOINT_LOG_FORMAT") {
            self.log_format = format.parse()?;
        }
        Ok(())
    }

    /// Apply the command-line layer.
    pub fn apply_flags(&mut self, store: Option<String>, mirror: Option<PathBuf>) {
        if let Some(store) = store {
            self.store = store;
        }
        if let Some(mirror) = mirror {
            self.mirror = mirror;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = WaypointConfig::from_toml("mirror = \"/var/lib/waypoint.redb\"").expect("parse");
        assert_eq!(config.mirror, PathBuf::from("/var/lib/waypoint.redb"));
        assert_eq!(config.store, WaypointConfig::default().store);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn unknown_key_is_rejected() {
        assert!(WaypointConfig::from_toml("mirorr = \"x\"").is_err());
    }

    #[test]
    fn precedence_is_flags_then_env_then_file() {
        let mut config = WaypointConfig::from_toml(
            "store = \"file.json\"\nmirror = \"file.redb\"\nlog_format = \"json\"",
        )
        .expect("parse");
        config
            .apply_env(env(&[
                ("WAYPOINT_STORE", "https://env.example"),
                ("WAYPOINT_MIRROR", "env.redb"),
            ]))
            .expect("env");
        config.apply_flags(None, Some(PathBuf::from("flag.redb")));

        assert_eq!(config.store, "https://env.example");
        assert_eq!(config.mirror, PathBuf::from("flag.redb"));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn bad_log_format_in_env_fails() {
        let mut config = WaypointConfig::default();
        let result = config.apply_env(env(&[("WAYPOINT_LOG_FORMAT", "yaml")]));
        assert!(matches!(result, Err(WizardError::SerializationError(_))));
    }
}
