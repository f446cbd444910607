//! HTTP client for OpenAI-compatible `/chat/completions` endpoints.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tally_core::smart_booking::{AiError, ChatCompletion, UserContent};
use tracing::debug;

use crate::provider::{ProviderError, ProviderSettings};

/// Upper bound on the error body kept in [`AiError::Status`].
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Sampling temperature; low so replies stay close to the JSON format.
const TEMPERATURE: f64 = 0.1;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Chat client for any OpenAI-compatible provider.
#[derive(Clone)]
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    endpoint: String,
    settings: ProviderSettings,
}

impl std::fmt::Debug for OpenAiCompatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatClient")
            .field("endpoint", &self.endpoint)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl OpenAiCompatClient {
    /// Creates a client whose requests are bounded by `settings.timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Client`] if the TLS backend fails to start.
    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("tally/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;
        let endpoint = format!("{}/chat/completions", settings.base_url.trim_end_matches('/'));
        Ok(Self {
            http,
            endpoint,
            settings,
        })
    }

    /// Full URL requests are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn model_for(&self, content: &UserContent) -> &str {
        if content.has_image() {
            &self.settings.vision_model
        } else {
            &self.settings.text_model
        }
    }
}

#[async_trait]
impl ChatCompletion for OpenAiCompatClient {
    async fn complete(&self, system_prompt: &str, content: UserContent) -> Result<String, AiError> {
        let model = self.model_for(&content).to_string();
        let body = request_body(&model, system_prompt, &content);
        debug!(model = %model, image = content.has_image(), "Sending chat completion");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.settings.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                AiError::Timeout
            } else {
                AiError::Unparseable(e.to_string())
            }
        })?;
        reply_text(parsed)
    }
}

/// Builds the JSON request for one system prompt and one user message.
fn request_body(model: &str, system_prompt: &str, content: &UserContent) -> Value {
    let user_content = match content {
        UserContent::Text(text) => json!(text),
        UserContent::Image {
            text,
            image_data_uri,
        } => json!([
            { "type": "text", "text": text },
            { "type": "image_url", "image_url": { "url": image_data_uri } }
        ]),
    };
    json!({
        "model": model,
        "temperature": TEMPERATURE,
        "messages": [
            { "role": "system", "content": system_prompt },
            { "role": "user", "content": user_content }
        ]
    })
}

fn reply_text(response: ChatResponse) -> Result<String, AiError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(AiError::EmptyReply)
}

fn transport_error(err: reqwest::Error) -> AiError {
    if err.is_timeout() {
        AiError::Timeout
    } else {
        AiError::Transport(err.to_string())
    }
}

/// Backend used when no provider is configured; every call fails with
/// [`AiError::NotConfigured`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCompletion;

#[async_trait]
impl ChatCompletion for DisabledCompletion {
    async fn complete(
        &self,
        _system_prompt: &str,
        _content: UserContent,
    ) -> Result<String, AiError> {
        Err(AiError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_request_shape() {
        let body = request_body("m", "sys", &UserContent::Text("午饭35".into()));
        assert_eq!(body["model"], "m");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "sys");
        assert_eq!(body["messages"][1]["content"], "午饭35");
        assert!(body["temperature"].is_number());
    }

    #[test]
    fn test_image_request_uses_content_parts() {
        let content = UserContent::Image {
            text: "识别小票".into(),
            image_data_uri: "data:image/png;base64,AAAA".into(),
        };
        let body = request_body("vision", "sys", &content);
        let parts = &body["messages"][1]["content"];
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(parts[1]["image_url"]["url"], "data:image/png;base64,AAAA");
    }

    #[test]
    fn test_reply_text_takes_first_choice() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [
                { "message": { "role": "assistant", "content": "{\"amount\": 35}" } },
                { "message": { "role": "assistant", "content": "ignored" } }
            ]
        }))
        .unwrap();
        assert_eq!(reply_text(response).unwrap(), "{\"amount\": 35}");
    }

    #[test]
    fn test_blank_or_missing_reply_is_empty() {
        let blank: ChatResponse =
            serde_json::from_value(json!({"choices": [{"message": {"content": "  "}}]})).unwrap();
        assert!(matches!(reply_text(blank), Err(AiError::EmptyReply)));

        let none: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(reply_text(none), Err(AiError::EmptyReply)));
    }
}
