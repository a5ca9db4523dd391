//! Engine configuration, loaded from JSON. Every field has a default, so an
//! empty object `{}` is a valid config.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What to do with lines that come before the first section header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreamblePolicy {
    /// Append them to the global script.
    #[default]
    Global,
    /// Drop them with a warning.
    Ignore,
    /// Reject any preamble line that is not blank or a comment.
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub preamble: PreamblePolicy,

    /// Name of the script every section's scope extends.
    #[serde(default = "default_global_name")]
    pub global_name: String,
}

fn default_global_name() -> String {
    "Global".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { preamble: PreamblePolicy::default(), global_name: default_global_name() }
    }
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io { path: path.display().to_string(), source: e })?;
        let config = Self::from_json(&text)?;
        tracing::debug!(path = %path.display(), preamble = ?config.preamble, "loaded engine config");
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut chars = self.global_name.chars();
        let valid = chars.next().is_some_and(|c| c.is_alphabetic() || c == '_')
            && chars.all(|c| c.is_alphanumeric() || c == '_');
        if !valid {
            return Err(ConfigError::Invalid(format!(
                "global_name `{}` is not an identifier", self.global_name
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn policy_is_lowercase() {
        let c = EngineConfig::from_json(r#"{ "preamble": "error", "global_name": "Main" }"#).unwrap();
        assert_eq!(c.preamble, PreamblePolicy::Error);
        assert_eq!(c.global_name, "Main");
    }

    #[test]
    fn rejects_bad_name() {
        assert!(matches!(EngineConfig::from_json(r#"{ "global_name": "1x" }"#), Err(ConfigError::Invalid(_))));
        assert!(matches!(EngineConfig::from_json(r#"{ "preamble": "maybe" }"#), Err(ConfigError::Json(_))));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        fs::write(&path, EngineConfig::default().to_json().unwrap()).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), EngineConfig::default());
        assert!(matches!(EngineConfig::load(dir.path().join("missing.json")), Err(ConfigError::Io { .. })));
    }
}
