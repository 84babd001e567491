//! Captioning provider trait and request/response types.
//!
//! Defines the interface every backend implements, plus the factory that
//! builds the configured backend at startup.

use crate::config::CaptionerConfig;
use crate::error::FlowError;
use async_trait::async_trait;
use base64::Engine;
use image::DynamicImage;
use std::io::Cursor;
use std::time::Duration;

/// The prompt sent with every photo unless configuration overrides it.
pub const DEFAULT_PROMPT: &str = "Generate a funny phrase based on this photo.";

/// Base64-encoded image ready to send to a captioning API.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type of the encoded bytes
    pub media_type: String,
}

impl ImageInput {
    /// Encode a decoded bitmap as PNG for the wire.
    ///
    /// Both selection variants converge here: gallery files are decoded
    /// first, camera frames arrive already decoded.
    pub fn from_image(image: &DynamicImage) -> Result<Self, FlowError> {
        let mut buf = Cursor::new(Vec::new());
        image
            .write_to(&mut buf, image::ImageFormat::Png)
            .map_err(|e| FlowError::Caption {
                message: format!("Cannot encode image for upload: {e}"),
                status_code: None,
            })?;

        Ok(Self {
            data: base64::engine::general_purpose::STANDARD.encode(buf.into_inner()),
            media_type: "image/png".to_string(),
        })
    }
}

/// A single captioning request: the resolved image plus the fixed prompt.
#[derive(Debug, Clone)]
pub struct CaptionRequest {
    /// The image to caption
    pub image: ImageInput,
    /// Text prompt for the model
    pub prompt: String,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

/// The response from a captioning call.
#[derive(Debug, Clone)]
pub struct CaptionResponse {
    /// Generated caption text. Empty when the service returned no text;
    /// that is an empty successful caption, not an error.
    pub text: String,
    /// Model identifier used
    pub model: String,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// Trait that all captioning backends implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Box<dyn CaptionProvider>` for dynamic dispatch).
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    /// Provider name for logging (e.g., "gemini", "ollama").
    fn name(&self) -> &str;

    /// Check whether the provider is configured and reachable.
    async fn is_available(&self) -> bool;

    /// Generate a caption for the given request.
    async fn caption(&self, request: &CaptionRequest) -> Result<CaptionResponse, FlowError>;

    /// Per-request timeout, enforced by the provider's own HTTP client.
    fn timeout(&self) -> Duration;
}

impl std::fmt::Debug for dyn CaptionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptionProvider")
            .field("name", &self.name())
            .finish()
    }
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok()
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Factory that builds the backend named by configuration.
///
/// Backend selection is fixed at startup; there is no per-request switching.
pub struct CaptionProviderFactory;

impl CaptionProviderFactory {
    /// Create the captioning provider for the given config section.
    pub fn create(config: &CaptionerConfig) -> Result<Box<dyn CaptionProvider>, FlowError> {
        match config.provider.as_str() {
            "gemini" => {
                let cfg = config.gemini.clone().unwrap_or_default();
                let api_key = resolve_env_var(&cfg.api_key).ok_or_else(|| FlowError::Caption {
                    message: "Gemini API key not set. Set GEMINI_API_KEY env var.".to_string(),
                    status_code: None,
                })?;
                Ok(Box::new(super::gemini::GeminiProvider::new(
                    &cfg.endpoint,
                    &api_key,
                    &cfg.model,
                )))
            }
            "anthropic" => {
                let cfg = config.anthropic.clone().unwrap_or_default();
                let api_key = resolve_env_var(&cfg.api_key).ok_or_else(|| FlowError::Caption {
                    message: "Anthropic API key not set. Set ANTHROPIC_API_KEY env var."
                        .to_string(),
                    status_code: None,
                })?;
                Ok(Box::new(super::anthropic::AnthropicProvider::new(
                    &api_key, &cfg.model,
                )))
            }
            "ollama" => {
                let cfg = config.ollama.clone().unwrap_or_default();
                Ok(Box::new(super::ollama::OllamaProvider::new(
                    &cfg.endpoint,
                    &cfg.model,
                )))
            }
            other => Err(FlowError::Caption {
                message: format!("Unknown captioning provider: {other}"),
                status_code: None,
            }),
        }
    }
}
