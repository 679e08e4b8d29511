//! Configuration resolution for tradedoc-wf
//!
//! Every setting resolves with ENV → TOML → compiled default priority. The
//! processing stall timeout is deliberately opt-in: without it a session
//! stuck in remote processing is resolved only by user retry or removal.

use std::time::Duration;
use tradedoc_common::config::{env_setting, TomlConfig};
use tradedoc_common::{Error, Result};
use tracing::warn;

const DEFAULT_BIND_PORT: u16 = 5740;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
const DEFAULT_SSE_THROTTLE_MS: u64 = 1_000;

/// Resolved service settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_port: u16,
    /// Base URL of the document processing backend
    pub processing_base_url: String,
    pub poll_interval: Duration,
    pub sse_throttle_ms: u64,
    /// Optional stall policy for sessions stuck in remote processing
    pub processing_timeout: Option<Duration>,
    pub log_level: String,
}

impl Settings {
    /// Resolve settings from environment variables and the TOML config file
    pub fn resolve() -> Result<Self> {
        let toml_config = TomlConfig::load("tradedoc-wf")?.unwrap_or_default();

        let bind_port = resolve_parsed(
            "TRADEDOC_PORT",
            toml_config.bind_port,
            DEFAULT_BIND_PORT,
        )?;

        let processing_base_url = env_setting("TRADEDOC_PROCESSING_URL")
            .or(toml_config.processing_base_url)
            .ok_or_else(|| {
                Error::Config(
                    "Processing backend URL not configured. Set TRADEDOC_PROCESSING_URL or \
                     processing_base_url in the TOML config."
                        .to_string(),
                )
            })?;

        let poll_interval_ms = resolve_parsed(
            "TRADEDOC_POLL_INTERVAL_MS",
            toml_config.poll_interval_ms,
            DEFAULT_POLL_INTERVAL_MS,
        )?;

        let sse_throttle_ms = resolve_parsed(
            "TRADEDOC_SSE_THROTTLE_MS",
            toml_config.sse_throttle_ms,
            DEFAULT_SSE_THROTTLE_MS,
        )?;

        let processing_timeout_secs: Option<u64> =
            match env_setting("TRADEDOC_PROCESSING_TIMEOUT_SECS") {
                Some(raw) => Some(parse_setting("TRADEDOC_PROCESSING_TIMEOUT_SECS", &raw)?),
                None => toml_config.processing_timeout_secs,
            };

        let log_level = env_setting("TRADEDOC_LOG_LEVEL").unwrap_or(toml_config.logging.level);

        Ok(Self {
            bind_port,
            processing_base_url,
            poll_interval: Duration::from_millis(poll_interval_ms),
            sse_throttle_ms,
            processing_timeout: processing_timeout_secs.map(Duration::from_secs),
            log_level,
        })
    }
}

/// ENV → TOML → default for a parseable setting, warning when both the
/// environment and the TOML file set it
fn resolve_parsed<T>(env_name: &str, toml_value: Option<T>, default: T) -> Result<T>
where
    T: std::str::FromStr + Copy,
{
    match env_setting(env_name) {
        Some(raw) => {
            if toml_value.is_some() {
                warn!(
                    "{} set in both environment and TOML config; using environment",
                    env_name
                );
            }
            parse_setting(env_name, &raw)
        }
        None => Ok(toml_value.unwrap_or(default)),
    }
}

fn parse_setting<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("Cannot parse {}: {:?}", name, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_setting_rejects_garbage() {
        assert!(parse_setting::<u16>("TEST", "not-a-port").is_err());
        assert_eq!(parse_setting::<u16>("TEST", " 8080 ").unwrap(), 8080);
    }

    #[test]
    fn env_wins_over_toml() {
        std::env::set_var("TRADEDOC_TEST_RESOLVE", "250");
        let value = resolve_parsed::<u64>("TRADEDOC_TEST_RESOLVE", Some(900), 100).unwrap();
        assert_eq!(value, 250);
        std::env::remove_var("TRADEDOC_TEST_RESOLVE");
    }

    #[test]
    fn toml_wins_over_default() {
        let value = resolve_parsed::<u64>("TRADEDOC_TEST_UNSET", Some(900), 100).unwrap();
        assert_eq!(value, 900);
        let value = resolve_parsed::<u64>("TRADEDOC_TEST_UNSET", None, 100).unwrap();
        assert_eq!(value, 100);
    }
}
