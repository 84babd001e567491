//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

/// Backends the factory knows how to build.
const KNOWN_PROVIDERS: &[&str] = &["gemini", "anthropic", "ollama"];

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !KNOWN_PROVIDERS.contains(&self.captioner.provider.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "captioner.provider must be one of {KNOWN_PROVIDERS:?}"
            )));
        }
        if self.captioner.prompt.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "captioner.prompt must not be empty".into(),
            ));
        }
        if self.captioner.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "captioner.max_tokens must be > 0".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.captioner.temperature) {
            return Err(ConfigError::ValidationError(
                "captioner.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.gallery.extensions.is_empty() {
            return Err(ConfigError::ValidationError(
                "gallery.extensions must not be empty".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        Ok(())
    }
}
