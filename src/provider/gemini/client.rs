//! Gemini client for API-key access through AI Studio.

use super::types::{GenerateContentRequest, GenerateContentResponse};
use crate::provider::api_provider::Provider;
use crate::provider::client::ChatModel;
use crate::provider::error::Error;
use crate::provider::http::{AuthConfig, HttpClient};
use crate::provider::types::{ChatResponse, ClientOptions, Message};
use async_trait::async_trait;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Normalize model name (strip any `models/` prefix).
fn normalize_model_name(model: &str) -> &str {
    let trimmed = model.trim();
    trimmed.strip_prefix("models/").unwrap_or(trimmed)
}

/// Gemini API-key client.
pub struct GeminiClient {
    http: HttpClient,
    model: String,
    options: ClientOptions,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, Error> {
        let http = HttpClient::new(
            BASE_URL,
            AuthConfig::ApiKey {
                header: "x-goog-api-key".to_string(),
                key: api_key.into(),
            },
        )?;
        let model: String = model.into();

        Ok(Self {
            http,
            model: normalize_model_name(&model).to_string(),
            options,
        })
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, messages: &[Message]) -> Result<ChatResponse, Error> {
        let request = GenerateContentRequest::build(messages, self.options);
        let path = format!("/models/{}:generateContent", self.model);

        tracing::debug!(model = %self.model, contents = request.contents.len(), "Gemini API request");

        let response: GenerateContentResponse = self.http.post_json(&path, &request).await?;
        let content = response
            .text()
            .ok_or_else(|| Error::EmptyResponse(Provider::Google.name().to_string()))?;

        Ok(ChatResponse { content })
    }
}
