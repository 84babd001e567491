//! Snapquip Core - Embeddable photo captioning flow.
//!
//! Snapquip takes a picked or captured photo, sends it to a hosted vision
//! model with a fixed prompt, and yields the generated caption (or a
//! user-readable error) through a small explicit state machine.
//!
//! # Architecture
//!
//! ```text
//! Select (gallery | camera) → Submit → Decode → Caption call → Result
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use snapquip_core::{CaptionFlow, CaptionProviderFactory, Config, FlowEvent, FlowState};
//!
//! #[tokio::main]
//! async fn main() -> snapquip_core::Result<()> {
//!     let config = Config::load()?;
//!     let provider = CaptionProviderFactory::create(&config.captioner)?;
//!     let flow = CaptionFlow::new(provider, &config.captioner, config.limits.clone());
//!
//!     let state = FlowState::default().apply(FlowEvent::Selected(selection));
//!     let state = flow.submit(&state).await;
//!     println!("{}", state.display_text());
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod captioner;
pub mod config;
pub mod decode;
pub mod error;
pub mod flow;
pub mod source;

// Re-exports for convenient access
pub use captioner::{
    CaptionProvider, CaptionProviderFactory, CaptionRequest, CaptionResponse, ImageInput,
    DEFAULT_PROMPT,
};
pub use config::Config;
pub use decode::ImageDecoder;
pub use error::{ConfigError, FlowError, FlowResult, Result, SnapquipError};
pub use flow::{CaptionFlow, CaptionOutcome, FlowEvent, FlowState};
pub use source::{CameraFrame, GalleryScan, ImageSelection, ImageSource, PathGallery};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
