//! Configuration management for Snapquip.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults; a missing file is not an error.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Snapquip.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Captioning backend settings
    pub captioner: CaptionerConfig,

    /// Gallery picker settings
    pub gallery: GalleryConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.snapquip.snapquip/config.toml
    /// - Linux: ~/.config/snapquip/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\snapquip\config\config.toml
    ///
    /// Falls back to ~/.snapquip/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "snapquip", "snapquip")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".snapquip").join("config.toml")
            })
    }

    /// Get the resolved gallery directory path (with ~ expansion).
    pub fn gallery_dir(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.gallery.dir);
        PathBuf::from(expanded.into_owned())
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.captioner.provider, "gemini");
        assert_eq!(config.limits.max_file_size_mb, 50);
        assert_eq!(config.limits.decode_timeout_ms, 5000);
        assert!(config.gallery.extensions.contains(&"jpeg".to_string()));
    }

    #[test]
    fn test_default_prompt_is_wired_in() {
        let config = Config::default();
        assert_eq!(
            config.captioner.prompt,
            "Generate a funny phrase based on this photo."
        );
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[captioner]"));
        assert!(toml.contains("[gallery]"));
        assert!(toml.contains("[limits]"));
    }

    #[test]
    fn test_load_from_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[captioner]\nprovider = \"ollama\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.captioner.provider, "ollama");
        // Untouched sections fall back to defaults
        assert_eq!(config.limits.max_image_dimension, 10000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_from_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "captioner = not-a-table").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_gallery_dir_expands_tilde() {
        let config = Config::default();
        let dir = config.gallery_dir();
        assert!(!dir.to_string_lossy().starts_with('~'));
    }
}
