//! Pipeline settings and validation.
//!
//! Pure domain types with no infrastructure dependencies. Adapters fill
//! these in from flags, environment variables, or a settings file.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of retries per phase.
pub const DEFAULT_RETRIES: u32 = 3;

/// Default first backoff delay in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 500;

/// Default backoff ceiling in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 8_000;

/// Upper bound on configurable retries.
pub const MAX_RETRIES: u32 = 10;

/// Retry policy applied to each phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrySettings {
    /// Retries after the first attempt.
    pub retries: u32,
    /// Delay before the first retry.
    pub base_delay_ms: u64,
    /// Cap for the exponential delay.
    pub max_delay_ms: u64,
    /// Scale each delay by a random factor in `[0.5, 1.0]`.
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            jitter: true,
        }
    }
}

/// Settings for the region download pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineSettings {
    pub retry: RetrySettings,
}

/// Settings validation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("retries must be at most {MAX_RETRIES}, got {0}")]
    TooManyRetries(u32),

    #[error("base_delay_ms must be greater than zero")]
    ZeroBaseDelay,

    #[error("max_delay_ms ({max}) must not be below base_delay_ms ({base})")]
    MaxBelowBase { base: u64, max: u64 },
}

/// Validate pipeline settings.
pub const fn validate_settings(settings: &PipelineSettings) -> Result<(), SettingsError> {
    let retry = &settings.retry;
    if retry.retries > MAX_RETRIES {
        return Err(SettingsError::TooManyRetries(retry.retries));
    }
    if retry.base_delay_ms == 0 {
        return Err(SettingsError::ZeroBaseDelay);
    }
    if retry.max_delay_ms < retry.base_delay_ms {
        return Err(SettingsError::MaxBelowBase {
            base: retry.base_delay_ms,
            max: retry.max_delay_ms,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_settings(&PipelineSettings::default()).is_ok());
    }

    #[test]
    fn rejects_bad_retry_settings() {
        let mut settings = PipelineSettings::default();
        settings.retry.retries = 11;
        assert_eq!(
            validate_settings(&settings),
            Err(SettingsError::TooManyRetries(11))
        );

        let mut settings = PipelineSettings::default();
        settings.retry.base_delay_ms = 0;
        assert_eq!(
            validate_settings(&settings),
            Err(SettingsError::ZeroBaseDelay)
        );

        let mut settings = PipelineSettings::default();
        settings.retry.max_delay_ms = 10;
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::MaxBelowBase { .. })
        ));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: PipelineSettings =
            serde_json::from_str(r#"{"retry": {"retries": 1}}"#).unwrap();
        assert_eq!(settings.retry.retries, 1);
        assert_eq!(settings.retry.base_delay_ms, DEFAULT_BASE_DELAY_MS);
        assert!(settings.retry.jitter);
    }
}
