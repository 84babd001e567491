//! The photo-caption request lifecycle.
//!
//! State is modeled as immutable snapshots folded through a reducer: every
//! change to the screen-facing state goes through `FlowState::apply`, and the
//! async submission settles by producing events rather than mutating shared
//! fields. Per attempt the lifecycle is
//!
//! ```text
//! Idle -> Requesting -> {Succeeded | Failed} -> Idle
//! ```
//!
//! with at most one attempt in flight, enforced by `can_submit` gating on the
//! caller side.

use crate::captioner::{CaptionProvider, CaptionRequest, ImageInput};
use crate::config::{CaptionerConfig, LimitsConfig};
use crate::decode::ImageDecoder;
use crate::error::FlowError;
use crate::source::ImageSelection;
use std::sync::Arc;

/// Outcome of a settled captioning attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptionOutcome {
    /// Caption text returned by the service (may be empty).
    Caption(String),
    /// Error description for a failed attempt.
    Failure(String),
}

/// Immutable snapshot of the flow's screen-facing state.
#[derive(Debug, Clone, Default)]
pub struct FlowState {
    /// The current photo, if any. Gallery and camera are mutually exclusive
    /// because a new selection replaces the whole value.
    pub selection: Option<ImageSelection>,

    /// Whether a captioning request is outstanding.
    pub in_flight: bool,

    /// Result of the last settled attempt; `None` until the first one.
    pub result: Option<CaptionOutcome>,

    /// Submission counter; completions carrying an older generation are
    /// stale and get discarded.
    generation: u64,
}

/// State-transition events. `FlowState::apply` is the only way state changes.
#[derive(Debug, Clone)]
pub enum FlowEvent {
    /// A source completed with a new selection.
    Selected(ImageSelection),

    /// A source completed with nothing; the user cancelled.
    SelectionCancelled,

    /// A submission attempt started.
    SubmitStarted { generation: u64 },

    /// A submission attempt settled, successfully or not.
    Completed {
        generation: u64,
        outcome: CaptionOutcome,
    },
}

impl FlowState {
    /// Submit is enabled iff a photo is selected and nothing is in flight.
    pub fn can_submit(&self) -> bool {
        self.selection.is_some() && !self.in_flight
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Text for the result area: empty before any attempt, the caption after
    /// a success, or the prefixed error message after a failure.
    pub fn display_text(&self) -> String {
        match &self.result {
            None => String::new(),
            Some(CaptionOutcome::Caption(text)) => text.clone(),
            Some(CaptionOutcome::Failure(message)) => format!("Error: {message}"),
        }
    }

    /// Fold one event into a new snapshot.
    pub fn apply(&self, event: FlowEvent) -> FlowState {
        let mut next = self.clone();
        match event {
            FlowEvent::Selected(selection) => {
                next.selection = Some(selection);
            }
            FlowEvent::SelectionCancelled => {}
            FlowEvent::SubmitStarted { generation } => {
                next.in_flight = true;
                next.generation = generation;
            }
            FlowEvent::Completed {
                generation,
                outcome,
            } => {
                if generation != self.generation {
                    // Stale completion from an abandoned attempt.
                    tracing::debug!(
                        completed = generation,
                        current = self.generation,
                        "Discarding stale caption completion"
                    );
                    return next;
                }
                next.in_flight = false;
                next.result = Some(outcome);
            }
        }
        next
    }
}

/// Drives one captioning attempt end to end.
///
/// Owns the configured provider, the decoder for gallery references, and the
/// prompt. The caller holds the `FlowState` and feeds it through `submit`.
pub struct CaptionFlow {
    provider: Arc<dyn CaptionProvider>,
    decoder: ImageDecoder,
    prompt: String,
    max_tokens: u32,
    temperature: f32,
}

impl CaptionFlow {
    pub fn new(
        provider: Box<dyn CaptionProvider>,
        captioner: &CaptionerConfig,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            provider: Arc::from(provider),
            decoder: ImageDecoder::new(limits),
            prompt: captioner.prompt.clone(),
            max_tokens: captioner.max_tokens,
            temperature: captioner.temperature,
        }
    }

    /// Submit the current selection for captioning and return the settled
    /// state.
    ///
    /// With no selection present this is a no-op: the input state comes back
    /// unchanged and in-flight never becomes true. Caller-side `can_submit`
    /// gating makes that case unreachable in practice, but it must not
    /// crash. Every started attempt settles through `Completed`, so
    /// in-flight is always cleared whether the provider succeeded or failed.
    pub async fn submit(&self, state: &FlowState) -> FlowState {
        let Some(selection) = state.selection.clone() else {
            tracing::debug!("Submit triggered without a selection; ignoring");
            return state.clone();
        };

        let generation = state.generation + 1;
        let state = state.apply(FlowEvent::SubmitStarted { generation });

        let outcome = match self.caption(selection).await {
            Ok(text) => CaptionOutcome::Caption(text),
            Err(e) => {
                tracing::error!(provider = self.provider.name(), "Captioning failed: {e}");
                CaptionOutcome::Failure(e.to_string())
            }
        };

        state.apply(FlowEvent::Completed {
            generation,
            outcome,
        })
    }

    /// Resolve the selection and call the provider.
    async fn caption(&self, selection: ImageSelection) -> Result<String, FlowError> {
        let image = self.resolve(selection).await?;
        let request = CaptionRequest {
            image,
            prompt: self.prompt.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self.provider.caption(&request).await?;
        tracing::info!(
            provider = self.provider.name(),
            model = %response.model,
            latency_ms = response.latency_ms,
            "Caption received"
        );
        Ok(response.text)
    }

    /// Resolve whichever selection variant is active into a wire-ready image.
    ///
    /// Gallery references are decoded here; camera frames arrive already
    /// decoded. Encoding runs off the async thread.
    async fn resolve(&self, selection: ImageSelection) -> Result<ImageInput, FlowError> {
        let image = match selection {
            ImageSelection::Camera(image) => image,
            ImageSelection::Gallery(path) => self.decoder.decode_file(&path).await?.image,
        };

        tokio::task::spawn_blocking(move || ImageInput::from_image(&image))
            .await
            .map_err(|e| FlowError::Caption {
                message: format!("Encode task failed: {e}"),
                status_code: None,
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captioner::CaptionResponse;
    use async_trait::async_trait;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// A configurable mock backend for exercising the flow.
    struct MockProvider {
        response_fn: Box<dyn Fn() -> Result<CaptionResponse, FlowError> + Send + Sync>,
        call_count: Arc<AtomicU32>,
    }

    impl MockProvider {
        fn success(text: &str) -> Self {
            let text = text.to_string();
            Self {
                response_fn: Box::new(move || {
                    Ok(CaptionResponse {
                        text: text.clone(),
                        model: "mock-v1".to_string(),
                        latency_ms: 10,
                    })
                }),
                call_count: Arc::new(AtomicU32::new(0)),
            }
        }

        fn failing(status_code: Option<u16>, message: &str) -> Self {
            let message = message.to_string();
            Self {
                response_fn: Box::new(move || {
                    Err(FlowError::Caption {
                        message: message.clone(),
                        status_code,
                    })
                }),
                call_count: Arc::new(AtomicU32::new(0)),
            }
        }

        /// Shared handle to the call counter (clone before moving provider).
        fn call_count_handle(&self) -> Arc<AtomicU32> {
            self.call_count.clone()
        }
    }

    #[async_trait]
    impl CaptionProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn caption(&self, _request: &CaptionRequest) -> Result<CaptionResponse, FlowError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            (self.response_fn)()
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(60)
        }
    }

    fn test_flow(provider: MockProvider) -> CaptionFlow {
        CaptionFlow::new(
            Box::new(provider),
            &CaptionerConfig::default(),
            LimitsConfig::default(),
        )
    }

    fn camera_image() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(6, 6, Rgb([90, 160, 210])))
    }

    fn camera_state() -> FlowState {
        FlowState::default().apply(FlowEvent::Selected(ImageSelection::Camera(camera_image())))
    }

    fn gallery_fixture(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("fixture.png");
        camera_image().save_with_format(&path, ImageFormat::Png).unwrap();
        path
    }

    // --- Reducer and gating invariants ---

    #[test]
    fn test_can_submit_requires_selection_and_idle() {
        let idle = FlowState::default();
        assert!(!idle.can_submit());

        let selected = camera_state();
        assert!(selected.can_submit());

        let requesting = selected.apply(FlowEvent::SubmitStarted { generation: 1 });
        assert!(!requesting.can_submit());

        let settled = requesting.apply(FlowEvent::Completed {
            generation: 1,
            outcome: CaptionOutcome::Caption("ok".to_string()),
        });
        assert!(settled.can_submit());
    }

    #[test]
    fn test_selection_replacement_is_mutually_exclusive() {
        let state = FlowState::default()
            .apply(FlowEvent::Selected(ImageSelection::Camera(camera_image())))
            .apply(FlowEvent::Selected(ImageSelection::Gallery(PathBuf::from(
                "a.jpg",
            ))));
        assert!(state.selection.as_ref().unwrap().is_gallery());

        let state = state.apply(FlowEvent::Selected(ImageSelection::Camera(camera_image())));
        assert!(state.selection.as_ref().unwrap().is_camera());

        // Back and forth once more; still exactly one variant held.
        let state = state.apply(FlowEvent::Selected(ImageSelection::Gallery(PathBuf::from(
            "b.png",
        ))));
        assert!(state.selection.as_ref().unwrap().is_gallery());
        assert!(!state.selection.as_ref().unwrap().is_camera());
    }

    #[test]
    fn test_cancelled_selection_keeps_current_one() {
        let state = camera_state().apply(FlowEvent::SelectionCancelled);
        assert!(state.selection.is_some());
        assert!(state.can_submit());
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let state = camera_state().apply(FlowEvent::SubmitStarted { generation: 2 });
        let state = state.apply(FlowEvent::Completed {
            generation: 1,
            outcome: CaptionOutcome::Caption("late".to_string()),
        });

        // The stale attempt neither settles the flight nor writes a result.
        assert!(state.in_flight);
        assert!(state.result.is_none());

        let state = state.apply(FlowEvent::Completed {
            generation: 2,
            outcome: CaptionOutcome::Caption("current".to_string()),
        });
        assert!(!state.in_flight);
        assert_eq!(state.display_text(), "current");
    }

    #[test]
    fn test_display_text_variants() {
        assert_eq!(FlowState::default().display_text(), "");

        let ok = FlowState::default().apply(FlowEvent::Completed {
            generation: 0,
            outcome: CaptionOutcome::Caption("Nice smile!".to_string()),
        });
        assert_eq!(ok.display_text(), "Nice smile!");

        let failed = FlowState::default().apply(FlowEvent::Completed {
            generation: 0,
            outcome: CaptionOutcome::Failure("quota exceeded".to_string()),
        });
        assert_eq!(failed.display_text(), "Error: quota exceeded");
    }

    // --- Submission lifecycle ---

    #[tokio::test]
    async fn test_submit_success() {
        let flow = test_flow(MockProvider::success("Nice smile!"));
        let state = flow.submit(&camera_state()).await;

        assert!(!state.in_flight);
        assert_eq!(state.result, Some(CaptionOutcome::Caption("Nice smile!".to_string())));
        assert_eq!(state.display_text(), "Nice smile!");
        // Selection survives the attempt; the user can resubmit.
        assert!(state.can_submit());
    }

    #[tokio::test]
    async fn test_submit_failure_surfaces_message_and_clears_in_flight() {
        let flow = test_flow(MockProvider::failing(Some(429), "quota exceeded"));
        let state = flow.submit(&camera_state()).await;

        assert!(!state.in_flight);
        match &state.result {
            Some(CaptionOutcome::Failure(message)) => {
                assert!(message.contains("quota exceeded"), "Got: {message}");
            }
            other => panic!("Expected failure outcome, got {other:?}"),
        }
        assert!(state.display_text().starts_with("Error: "));
    }

    #[tokio::test]
    async fn test_submit_empty_text_is_empty_caption() {
        let flow = test_flow(MockProvider::success(""));
        let state = flow.submit(&camera_state()).await;

        assert!(!state.in_flight);
        assert_eq!(state.result, Some(CaptionOutcome::Caption(String::new())));
        assert_eq!(state.display_text(), "");
    }

    #[tokio::test]
    async fn test_submit_without_selection_is_noop() {
        let provider = MockProvider::success("should not reach");
        let call_count = provider.call_count_handle();
        let flow = test_flow(provider);

        let before = FlowState::default().apply(FlowEvent::Completed {
            generation: 0,
            outcome: CaptionOutcome::Caption("previous".to_string()),
        });
        let after = flow.submit(&before).await;

        assert!(!after.in_flight);
        assert_eq!(after.display_text(), "previous");
        assert_eq!(after.generation(), before.generation());
        assert_eq!(call_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_submit_is_idempotent_for_stateless_service() {
        let flow = test_flow(MockProvider::success("Same joke twice."));
        let first = flow.submit(&camera_state()).await;
        let second = flow.submit(&first).await;

        assert_eq!(first.display_text(), second.display_text());
        assert!(!second.in_flight);
        assert_eq!(second.generation(), first.generation() + 1);
    }

    #[tokio::test]
    async fn test_submit_gallery_selection_decodes_then_captions() {
        let dir = tempfile::tempdir().unwrap();
        let path = gallery_fixture(dir.path());

        let flow = test_flow(MockProvider::success("A very green rectangle."));
        let state =
            FlowState::default().apply(FlowEvent::Selected(ImageSelection::Gallery(path)));
        let state = flow.submit(&state).await;

        assert_eq!(state.display_text(), "A very green rectangle.");
    }

    #[tokio::test]
    async fn test_submit_gallery_decode_failure_becomes_caption_failure() {
        let provider = MockProvider::success("unreachable");
        let call_count = provider.call_count_handle();
        let flow = test_flow(provider);

        let state = FlowState::default().apply(FlowEvent::Selected(ImageSelection::Gallery(
            PathBuf::from("/nowhere/ghost.jpg"),
        )));
        let state = flow.submit(&state).await;

        assert!(!state.in_flight);
        assert!(state.display_text().starts_with("Error: "));
        // Resolution failed before the provider was ever called.
        assert_eq!(call_count.load(Ordering::SeqCst), 0);
    }
}
