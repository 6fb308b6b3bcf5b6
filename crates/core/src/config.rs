//! Environment configuration for the bot process.
//!
//! All required variables are validated eagerly at startup; a missing or
//! malformed value is fatal and names the offending variable. The resulting
//! struct is immutable and passed into components explicitly; nothing
//! reads the process environment after startup.

/// Errors raised while building a [`BotConfig`] from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is unset or empty.
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    /// A variable is set but could not be parsed.
    #[error("Invalid value for {name}: {message}")]
    Invalid {
        name: &'static str,
        message: String,
    },
}

/// Immutable configuration for the Slack bot process.
///
/// | Env Var                      | Required | Default |
/// |------------------------------|----------|---------|
/// | `SLACK_BOT_TOKEN`            | yes      | —       |
/// | `REPLICATE_API_TOKEN`        | yes      | —       |
/// | `REPLICATE_LORA_VERSION`     | yes      | —       |
/// | `PORT`                       | no       | `3000`  |
/// | `MAX_CONCURRENT_GENERATIONS` | no       | `4`     |
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Slack bot user OAuth token (`xoxb-...`).
    pub slack_bot_token: String,
    /// Replicate API token used for inference requests.
    pub replicate_api_token: String,
    /// Trained LoRA model version id passed to every inference request.
    pub lora_version: String,
    /// HTTP bind port.
    pub port: u16,
    /// Upper bound on concurrently running generation jobs.
    pub max_concurrent_generations: usize,
}

impl BotConfig {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            slack_bot_token: require("SLACK_BOT_TOKEN")?,
            replicate_api_token: require("REPLICATE_API_TOKEN")?,
            lora_version: require("REPLICATE_LORA_VERSION")?,
            port: parse_or("PORT", 3000)?,
            max_concurrent_generations: parse_or("MAX_CONCURRENT_GENERATIONS", 4)?,
        })
    }
}

/// Read a required variable, treating empty values as missing.
fn require(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

/// Read an optional variable, falling back to `default` when unset.
fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    // Environment variables are process-global, so these tests use
    // distinct variable names via the helpers rather than BotConfig
    // itself to stay independent of test ordering.

    #[test]
    fn require_missing_names_the_variable() {
        std::env::remove_var("LITTLEME_TEST_ABSENT");
        let err = require("LITTLEME_TEST_ABSENT").unwrap_err();
        assert_matches!(err, ConfigError::Missing("LITTLEME_TEST_ABSENT"));
        assert!(err.to_string().contains("LITTLEME_TEST_ABSENT"));
    }

    #[test]
    fn require_empty_counts_as_missing() {
        std::env::set_var("LITTLEME_TEST_EMPTY", "   ");
        let err = require("LITTLEME_TEST_EMPTY").unwrap_err();
        assert_matches!(err, ConfigError::Missing(_));
    }

    #[test]
    fn parse_or_uses_default_when_unset() {
        std::env::remove_var("LITTLEME_TEST_PORT_UNSET");
        let port: u16 = parse_or("LITTLEME_TEST_PORT_UNSET", 3000).unwrap();
        assert_eq!(port, 3000);
    }

    #[test]
    fn parse_or_rejects_garbage() {
        std::env::set_var("LITTLEME_TEST_PORT_BAD", "not-a-port");
        let result: Result<u16, _> = parse_or("LITTLEME_TEST_PORT_BAD", 3000);
        assert_matches!(result, Err(ConfigError::Invalid { name: "LITTLEME_TEST_PORT_BAD", .. }));
    }

    #[test]
    fn parse_or_parses_valid_value() {
        std::env::set_var("LITTLEME_TEST_PORT_OK", "8080");
        let port: u16 = parse_or("LITTLEME_TEST_PORT_OK", 3000).unwrap();
        assert_eq!(port, 8080);
    }
}
