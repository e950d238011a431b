pub mod schema;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::GeminiConfig;

pub const DEFAULT_VIDEO_MIME: &str = "video/mp4";
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("request to the model failed: {0}")]
    Request(reqwest::Error),

    #[error("model returned {status}: {body}")]
    Upstream { status: reqwest::StatusCode, body: String },

    #[error("no text in model response")]
    MissingContent,

    #[error("model output does not match the expected schema: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for AnalyzerError {
    // Request URLs never reach logs.
    fn from(e: reqwest::Error) -> Self {
        AnalyzerError::Request(e.without_url())
    }
}

/// Base64 media as sent by clients, optionally as a `data:` URL.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaPayload {
    pub mime_type: String,
    pub data: String,
}

impl MediaPayload {
    pub fn from_base64(raw: &str, default_mime: &str) -> Self {
        if let Some(rest) = raw.strip_prefix("data:") {
            if let Some((mime, data)) = rest.split_once(";base64,") {
                if !mime.is_empty() {
                    return Self {
                        mime_type: mime.to_string(),
                        data: data.to_string(),
                    };
                }
            }
        }
        Self {
            mime_type: default_mime.to_string(),
            data: raw.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportSubmission {
    pub image: MediaPayload,
    pub title: String,
    pub description: String,
    pub phone: String,
    pub location: String,
}

/// The two model calls the API makes. Both return the model's raw JSON text;
/// callers validate it with the parsers in [`schema`].
#[async_trait]
pub trait MediaAnalyzer: Send + Sync {
    async fn detect_hazards(&self, video: &MediaPayload) -> Result<String, AnalyzerError>;

    async fn analyze_report(&self, report: &ReportSubmission) -> Result<String, AnalyzerError>;
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self, AnalyzerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn generate_content(&self, body: &Value) -> Result<String, AnalyzerError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(AnalyzerError::Upstream { status, body });
        }

        let json: Value = res.json().await?;
        first_candidate_text(&json)
    }
}

/// Builds a `generateContent` body: one user turn with the media inlined
/// ahead of the prompt, JSON output constrained by `response_schema`.
pub fn build_request(
    media: &MediaPayload,
    prompt: &str,
    system_instruction: &str,
    response_schema: Value,
) -> Value {
    json!({
        "systemInstruction": {
            "parts": [{ "text": system_instruction }]
        },
        "contents": [{
            "role": "user",
            "parts": [
                { "inlineData": { "mimeType": media.mime_type, "data": media.data } },
                { "text": prompt }
            ]
        }],
        "generationConfig": {
            "temperature": 0.1,
            "responseMimeType": "application/json",
            "responseSchema": response_schema
        }
    })
}

/// Extracts `candidates[0].content.parts[0].text`.
pub fn first_candidate_text(response: &Value) -> Result<String, AnalyzerError> {
    response["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(|text| schema::strip_code_fence(text).to_string())
        .ok_or(AnalyzerError::MissingContent)
}

#[async_trait]
impl MediaAnalyzer for GeminiClient {
    async fn detect_hazards(&self, video: &MediaPayload) -> Result<String, AnalyzerError> {
        let body = build_request(
            video,
            schema::HAZARD_PROMPT,
            schema::HAZARD_SYSTEM_INSTRUCTION,
            schema::hazard_response_schema(),
        );
        self.generate_content(&body).await
    }

    async fn analyze_report(&self, report: &ReportSubmission) -> Result<String, AnalyzerError> {
        let prompt = schema::report_prompt(&report.title, &report.description, &report.phone, &report.location);
        let body = build_request(
            &report.image,
            &prompt,
            schema::REPORT_SYSTEM_INSTRUCTION,
            schema::report_response_schema(),
        );
        self.generate_content(&body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_urls_carry_their_own_mime_type() {
        let media = MediaPayload::from_base64("data:image/png;base64,iVBORw0KGgo=", DEFAULT_IMAGE_MIME);
        assert_eq!(media.mime_type, "image/png");
        assert_eq!(media.data, "iVBORw0KGgo=");
    }

    #[test]
    fn bare_base64_uses_the_default_mime_type() {
        let media = MediaPayload::from_base64("AAAAGGZ0eXBtcDQy", DEFAULT_VIDEO_MIME);
        assert_eq!(media.mime_type, "video/mp4");
        assert_eq!(media.data, "AAAAGGZ0eXBtcDQy");
    }

    #[test]
    fn request_inlines_media_before_the_prompt() {
        let media = MediaPayload::from_base64("AAAA", DEFAULT_VIDEO_MIME);
        let body = build_request(
            &media,
            schema::HAZARD_PROMPT,
            schema::HAZARD_SYSTEM_INSTRUCTION,
            schema::hazard_response_schema(),
        );

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "video/mp4");
        assert_eq!(parts[0]["inlineData"]["data"], "AAAA");
        assert_eq!(parts[1]["text"], schema::HAZARD_PROMPT);
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], schema::HAZARD_SYSTEM_INSTRUCTION);
        assert_eq!(body["generationConfig"]["temperature"], 0.1);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["required"], json!(["status"]));
    }

    #[test]
    fn extracts_the_first_candidate_text() {
        let response = json!({
            "candidates": [
                { "content": { "parts": [{ "text": "{\"status\":\"safe\"}" }, { "text": "ignored" }] } },
                { "content": { "parts": [{ "text": "second" }] } }
            ]
        });
        assert_eq!(first_candidate_text(&response).unwrap(), "{\"status\":\"safe\"}");
    }

    #[tokio::test]
    async fn transport_errors_do_not_carry_the_api_key() {
        let client = GeminiClient::new(&GeminiConfig {
            api_key: "SUPERSECRETKEY".to_string(),
            model: "gemini-2.5-flash".to_string(),
            base_url: "http://127.0.0.1:1/v1beta".to_string(),
            timeout_secs: 5,
        })
        .unwrap();

        let err = client
            .detect_hazards(&MediaPayload::from_base64("AAAA", DEFAULT_VIDEO_MIME))
            .await
            .unwrap_err();

        assert!(matches!(err, AnalyzerError::Request(_)));
        assert!(!err.to_string().contains("SUPERSECRETKEY"));
        assert!(!format!("{err:?}").contains("SUPERSECRETKEY"));
    }

    #[test]
    fn a_blocked_response_has_no_content() {
        let response = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(matches!(first_candidate_text(&response), Err(AnalyzerError::MissingContent)));
    }
}
