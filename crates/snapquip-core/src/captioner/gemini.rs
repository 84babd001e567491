//! Gemini captioning provider using the generateContent API.
//!
//! Sends the image as an inline_data part followed by the text prompt to the
//! Google Generative Language API.

use super::provider::{CaptionProvider, CaptionRequest, CaptionResponse};
use crate::error::FlowError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Gemini provider using the generateContent API.
pub struct GeminiProvider {
    api_base: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(endpoint: &str, api_key: &str, model: &str) -> Self {
        Self {
            api_base: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Build the generateContent URL, tolerating a `models/` prefix in config.
    fn endpoint_for_model(&self) -> String {
        let model = self.model.trim();
        let model_path = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }
}

// --- Request types ---

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Inline { inline_data: InlineData },
    Text { text: String },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

// --- Response types ---

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "modelVersion")]
    model_version: Option<String>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenate the text parts of the first candidate.
    ///
    /// A response without candidates or text parts yields an empty string;
    /// the flow treats that as an empty successful caption.
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}

#[async_trait]
impl CaptionProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn caption(&self, request: &CaptionRequest) -> Result<CaptionResponse, FlowError> {
        let start = Instant::now();

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: request.image.media_type.clone(),
                            data: request.image.data.clone(),
                        },
                    },
                    Part::Text {
                        text: request.prompt.clone(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
            },
        };

        let resp = self
            .client
            .post(self.endpoint_for_model())
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| FlowError::Caption {
                message: format!("Gemini request failed: {e}"),
                status_code: None,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(FlowError::Caption {
                message: format!("Gemini HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let gemini_resp: GenerateContentResponse =
            resp.json().await.map_err(|e| FlowError::Caption {
                message: format!("Cannot parse Gemini response: {e}"),
                status_code: None,
            })?;

        let model = gemini_resp
            .model_version
            .clone()
            .unwrap_or_else(|| self.model.clone());

        Ok(CaptionResponse {
            text: gemini_resp.text(),
            model,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_for_model_adds_models_prefix() {
        let provider = GeminiProvider::new(
            "https://generativelanguage.googleapis.com/v1beta/",
            "key",
            "gemini-2.5-flash",
        );
        assert_eq!(
            provider.endpoint_for_model(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_endpoint_for_model_keeps_existing_prefix() {
        let provider = GeminiProvider::new("https://example.test/v1beta", "key", "models/custom");
        assert_eq!(
            provider.endpoint_for_model(),
            "https://example.test/v1beta/models/custom:generateContent"
        );
    }

    #[test]
    fn test_request_wire_format() {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: "image/png".to_string(),
                            data: "QUJD".to_string(),
                        },
                    },
                    Part::Text {
                        text: "caption this".to_string(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: 120,
                temperature: 0.8,
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["inline_data"]["mime_type"], "image/png");
        assert_eq!(parts[1]["text"], "caption this");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 120);
    }

    #[test]
    fn test_response_text_extraction() {
        let raw = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "A dog "}, {"text": "wearing sunglasses."}]}}
            ],
            "modelVersion": "gemini-2.5-flash"
        }"#;
        let resp: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.text(), "A dog wearing sunglasses.");
    }

    #[test]
    fn test_response_without_text_is_empty_caption() {
        let raw = r#"{"candidates": [{"content": {"parts": []}}]}"#;
        let resp: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.text(), "");

        let raw = r#"{}"#;
        let resp: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.text(), "");
    }
}
