//! Remote captioning service integration.
//!
//! A provider abstraction over the supported generative backends (Gemini,
//! Anthropic, Ollama). The active backend and model are fixed by
//! configuration at startup; callers see only `CaptionProvider`.

pub(crate) mod anthropic;
pub(crate) mod gemini;
pub(crate) mod ollama;
pub(crate) mod provider;

pub use provider::{
    resolve_env_var, CaptionProvider, CaptionProviderFactory, CaptionRequest, CaptionResponse,
    ImageInput, DEFAULT_PROMPT,
};
