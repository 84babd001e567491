//! Error types for the Snapquip caption flow.
//!
//! Errors are organized by stage so messages carry the context a user needs
//! (file paths, backend status codes, the failing step).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Snapquip operations.
#[derive(Error, Debug)]
pub enum SnapquipError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Caption flow errors
    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised while acquiring, resolving, or captioning a photo.
#[derive(Error, Debug)]
pub enum FlowError {
    /// Acquiring an image from a source failed
    #[error("Source error: {0}")]
    Source(String),

    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Decoding did not finish within the configured limit
    #[error("Decode timed out for {path} after {timeout_ms}ms")]
    DecodeTimeout { path: PathBuf, timeout_ms: u64 },

    /// The remote captioning call failed
    #[error("Caption error: {message}")]
    Caption {
        message: String,
        status_code: Option<u16>,
    },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Unsupported image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

/// Convenience type alias for Snapquip results.
pub type Result<T> = std::result::Result<T, SnapquipError>;

/// Convenience type alias for flow-specific results.
pub type FlowResult<T> = std::result::Result<T, FlowError>;
