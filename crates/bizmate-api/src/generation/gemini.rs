use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::info;

use super::{GenerationError, GenerationProvider};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Finish reasons that mean the provider refused to answer.
const BLOCKING_FINISH_REASONS: &[&str] =
    &["SAFETY", "RECITATION", "BLOCKLIST", "PROHIBITED_CONTENT", "SPII"];

/// Google Gemini `generateContent` over plain HTTPS.
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, base_url: Option<String>, model: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// First model the key can see that supports `generateContent`.
    pub async fn discover_model(&self) -> Result<String, GenerationError> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| GenerationError::Unavailable(e.to_string()))?;

        let body = read_json(response).await?;
        let models = generation_models(&body);
        info!("Gemini models supporting generateContent: {:?}", models);

        models
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::Malformed("no model supports generateContent".into()))
    }
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        if self.api_key.is_empty() {
            return Err(GenerationError::NotConfigured);
        }

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({
                "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
            }))
            .send()
            .await
            .map_err(|e| GenerationError::Unavailable(e.to_string()))?;

        let body = read_json(response).await?;
        extract_text(&body)
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, GenerationError> {
    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        return Err(GenerationError::Unavailable(format!("HTTP {status}: {detail}")));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| GenerationError::Malformed(e.to_string()))
}

/// Pull the reply text out of a `generateContent` response body.
fn extract_text(body: &Value) -> Result<String, GenerationError> {
    if let Some(reason) = body["promptFeedback"]["blockReason"].as_str() {
        return Err(GenerationError::Rejected(reason.to_string()));
    }

    let candidate = &body["candidates"][0];
    if candidate.is_null() {
        return Err(GenerationError::Malformed("response has no candidates".into()));
    }

    let text: String = candidate["content"]["parts"]
        .as_array()
        .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect())
        .unwrap_or_default();

    if !text.trim().is_empty() {
        return Ok(text);
    }

    match candidate["finishReason"].as_str() {
        Some(reason) if BLOCKING_FINISH_REASONS.contains(&reason) => {
            Err(GenerationError::Rejected(reason.to_string()))
        }
        _ => Err(GenerationError::Malformed("candidate has no text".into())),
    }
}

/// Model ids (without the `models/` prefix) that advertise `generateContent`,
/// in listing order.
fn generation_models(body: &Value) -> Vec<String> {
    body["models"]
        .as_array()
        .map(|models| {
            models
                .iter()
                .filter(|m| {
                    m["supportedGenerationMethods"]
                        .as_array()
                        .is_some_and(|methods| methods.iter().any(|v| v.as_str() == Some("generateContent")))
                })
                .filter_map(|m| m["name"].as_str())
                .map(|name| name.strip_prefix("models/").unwrap_or(name).to_string())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_text_parts_of_first_candidate() {
        let body = json!({
            "candidates": [
                { "content": { "parts": [{ "text": "Hello! " }, { "text": "We open at 9." }] },
                  "finishReason": "STOP" },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        });
        assert_eq!(extract_text(&body).unwrap(), "Hello! We open at 9.");
    }

    #[test]
    fn blocked_prompt_is_rejected() {
        let body = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(matches!(extract_text(&body), Err(GenerationError::Rejected(r)) if r == "SAFETY"));
    }

    #[test]
    fn safety_stop_without_text_is_rejected() {
        let body = json!({ "candidates": [{ "finishReason": "SAFETY" }] });
        assert!(matches!(extract_text(&body), Err(GenerationError::Rejected(_))));
    }

    #[test]
    fn empty_response_is_malformed() {
        assert!(matches!(extract_text(&json!({})), Err(GenerationError::Malformed(_))));
        let body = json!({ "candidates": [{ "content": { "parts": [] }, "finishReason": "STOP" }] });
        assert!(matches!(extract_text(&body), Err(GenerationError::Malformed(_))));
    }

    #[test]
    fn model_listing_keeps_generate_capable_models() {
        let body = json!({
            "models": [
                { "name": "models/embedding-001", "supportedGenerationMethods": ["embedContent"] },
                { "name": "models/gemini-1.5-pro", "supportedGenerationMethods": ["generateContent", "countTokens"] },
                { "name": "models/gemini-1.5-flash", "supportedGenerationMethods": ["generateContent"] }
            ]
        });
        assert_eq!(generation_models(&body), ["gemini-1.5-pro", "gemini-1.5-flash"]);
        assert!(generation_models(&json!({})).is_empty());
    }

    #[tokio::test]
    async fn empty_key_reports_not_configured() {
        let provider = GeminiProvider::new(String::new(), None, None);
        assert_eq!(provider.model(), DEFAULT_MODEL);
        assert!(matches!(provider.generate("hi").await, Err(GenerationError::NotConfigured)));
    }
}
