//! Environment-backed runtime configuration for `projector-smoke`.

use std::{env, error::Error, fmt};

use projector_core::{
    ProjectorConfig,
    config::{DEFAULT_CHANGE_BUFFER, DEFAULT_TITLE_MAX_CHARS},
};

const DEFAULT_USER_ID: &str = "smoke-user";
const DEFAULT_CHANNEL_TYPE: &str = "messaging";
const DEFAULT_CHANNEL_ID: &str = "smoke-general";
const DEFAULT_CONNECT_DELAY_MS: u64 = 50;

/// Runtime configuration used by the smoke run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokeConfig {
    /// User the in-memory SDK signs in as.
    pub user_id: String,
    /// Channel type tag to load.
    pub channel_type: String,
    /// Channel id to load.
    pub channel_id: String,
    /// Simulated delay before the client becomes ready.
    pub connect_delay_ms: u64,
    /// Projector tuning.
    pub projector: ProjectorConfig,
}

impl SmokeConfig {
    /// Parse configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let user_id = optional_trimmed_env("PROJECTOR_SMOKE_USER", &mut lookup)
            .unwrap_or_else(|| DEFAULT_USER_ID.to_owned());
        let channel_type = optional_trimmed_env("PROJECTOR_SMOKE_CHANNEL_TYPE", &mut lookup)
            .unwrap_or_else(|| DEFAULT_CHANNEL_TYPE.to_owned());
        let channel_id = optional_trimmed_env("PROJECTOR_SMOKE_CHANNEL_ID", &mut lookup)
            .unwrap_or_else(|| DEFAULT_CHANNEL_ID.to_owned());
        let connect_delay_ms = parse_optional_u64(
            "PROJECTOR_SMOKE_CONNECT_DELAY_MS",
            DEFAULT_CONNECT_DELAY_MS,
            &mut lookup,
        )?;

        let title_max_chars = parse_optional_usize(
            "PROJECTOR_TITLE_MAX_CHARS",
            DEFAULT_TITLE_MAX_CHARS,
            &mut lookup,
        )?;
        let change_buffer = parse_optional_usize(
            "PROJECTOR_CHANGE_BUFFER",
            DEFAULT_CHANGE_BUFFER,
            &mut lookup,
        )?;

        if title_max_chars == 0 {
            return Err(ConfigError::InvalidValue {
                key: "PROJECTOR_TITLE_MAX_CHARS",
                value: "0".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }
        if change_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                key: "PROJECTOR_CHANGE_BUFFER",
                value: "0".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }

        Ok(Self {
            user_id,
            channel_type,
            channel_id,
            connect_delay_ms,
            projector: ProjectorConfig::default()
                .with_title_max_chars(title_max_chars)
                .with_change_buffer(change_buffer),
        })
    }
}

/// Errors produced while parsing runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid {key}='{value}': {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

fn optional_trimmed_env<F>(key: &'static str, lookup: &mut F) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_optional_usize<F>(
    key: &'static str,
    default: usize,
    lookup: &mut F,
) -> Result<usize, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = optional_trimmed_env(key, lookup) else {
        return Ok(default);
    };
    value
        .parse::<usize>()
        .map_err(|err| ConfigError::InvalidValue {
            key,
            value,
            reason: err.to_string(),
        })
}

fn parse_optional_u64<F>(key: &'static str, default: u64, lookup: &mut F) -> Result<u64, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = optional_trimmed_env(key, lookup) else {
        return Ok(default);
    };
    value
        .parse::<u64>()
        .map_err(|err| ConfigError::InvalidValue {
            key,
            value,
            reason: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from_pairs(pairs: &[(&str, &str)]) -> Result<SmokeConfig, ConfigError> {
        let map = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect::<HashMap<_, _>>();
        SmokeConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn uses_defaults_when_unset() {
        let cfg = config_from_pairs(&[]).expect("empty config should parse");
        assert_eq!(cfg.user_id, DEFAULT_USER_ID);
        assert_eq!(cfg.channel_type, DEFAULT_CHANNEL_TYPE);
        assert_eq!(cfg.channel_id, DEFAULT_CHANNEL_ID);
        assert_eq!(cfg.connect_delay_ms, DEFAULT_CONNECT_DELAY_MS);
        assert_eq!(cfg.projector, ProjectorConfig::default());
    }

    #[test]
    fn parses_channel_and_projector_overrides() {
        let cfg = config_from_pairs(&[
            ("PROJECTOR_SMOKE_CHANNEL_TYPE", " livestream "),
            ("PROJECTOR_SMOKE_CHANNEL_ID", "launch"),
            ("PROJECTOR_TITLE_MAX_CHARS", "12"),
            ("PROJECTOR_CHANGE_BUFFER", "64"),
        ])
        .expect("config should parse");

        assert_eq!(cfg.channel_type, "livestream");
        assert_eq!(cfg.channel_id, "launch");
        assert_eq!(cfg.projector.title_max_chars, 12);
        assert_eq!(cfg.projector.change_buffer, 64);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let cfg = config_from_pairs(&[
            ("PROJECTOR_SMOKE_CHANNEL_ID", "   "),
            ("PROJECTOR_TITLE_MAX_CHARS", ""),
        ])
        .expect("blank values should parse");
        assert_eq!(cfg.channel_id, DEFAULT_CHANNEL_ID);
        assert_eq!(cfg.projector.title_max_chars, DEFAULT_TITLE_MAX_CHARS);
    }

    #[test]
    fn rejects_invalid_numeric_values() {
        let err = config_from_pairs(&[("PROJECTOR_CHANGE_BUFFER", "lots")])
            .expect_err("invalid buffer value should fail");

        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "PROJECTOR_CHANGE_BUFFER",
                ..
            }
        ));
    }

    #[test]
    fn rejects_zero_title_length() {
        let err = config_from_pairs(&[("PROJECTOR_TITLE_MAX_CHARS", "0")])
            .expect_err("zero title length should fail");
        assert_eq!(
            err.to_string(),
            "invalid PROJECTOR_TITLE_MAX_CHARS='0': must be at least 1"
        );
    }
}
