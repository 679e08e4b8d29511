//! Configuration loading for TradeDoc services
//!
//! Services resolve each setting with ENV → TOML → compiled default
//! priority. The TOML file lives in the platform config directory
//! (`~/.config/tradedoc/<service>.toml` on Linux, with
//! `/etc/tradedoc/<service>.toml` as the system-wide fallback).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Logging configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Maximum log level: "error", "warn", "info", "debug", "trace"
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// TOML configuration file contents
///
/// All fields optional; unset fields fall through to environment variables
/// and then to compiled defaults during service-level resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// HTTP bind port
    pub bind_port: Option<u16>,

    /// Base URL of the document processing backend
    pub processing_base_url: Option<String>,

    /// Interval between processing status polls (milliseconds)
    pub poll_interval_ms: Option<u64>,

    /// Minimum interval between throttled SSE progress events (milliseconds)
    pub sse_throttle_ms: Option<u64>,

    /// Optional stall policy: fail a session stuck in remote processing
    /// after this many seconds. Unset means no timeout; a stalled session is
    /// resolved only by user-initiated retry or removal.
    pub processing_timeout_secs: Option<u64>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Load the configuration file for a service, if one exists
    ///
    /// A missing file is not an error (all settings have defaults); a file
    /// that exists but does not parse is.
    pub fn load(service_name: &str) -> Result<Option<Self>> {
        let Some(path) = config_file_path(service_name) else {
            return Ok(None);
        };

        let content = std::fs::read_to_string(&path)?;
        let config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

        tracing::info!(path = %path.display(), "Loaded TOML configuration");
        Ok(Some(config))
    }
}

/// Locate the configuration file for a service on this platform
///
/// Checks the per-user config directory first, then the system-wide
/// location. Returns `None` when neither file exists.
pub fn config_file_path(service_name: &str) -> Option<PathBuf> {
    let filename = format!("{}.toml", service_name);

    if let Some(user_config) = dirs::config_dir().map(|d| d.join("tradedoc").join(&filename)) {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    let system_config = PathBuf::from("/etc/tradedoc").join(&filename);
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

/// Read an environment variable, treating empty/whitespace values as unset
pub fn env_setting(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_config_parses_partial_file() {
        let config: TomlConfig = toml::from_str(
            r#"
            processing_base_url = "http://localhost:9200"
            poll_interval_ms = 500

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.processing_base_url.as_deref(),
            Some("http://localhost:9200")
        );
        assert_eq!(config.poll_interval_ms, Some(500));
        assert_eq!(config.bind_port, None);
        assert_eq!(config.processing_timeout_secs, None);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn empty_env_values_are_unset() {
        std::env::set_var("TRADEDOC_TEST_EMPTY", "   ");
        assert_eq!(env_setting("TRADEDOC_TEST_EMPTY"), None);
        std::env::set_var("TRADEDOC_TEST_SET", "value");
        assert_eq!(env_setting("TRADEDOC_TEST_SET"), Some("value".to_string()));
    }
}
