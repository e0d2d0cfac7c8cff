//! Anthropic Messages API client.

use super::request::AnthropicRequest;
use super::response::AnthropicResponse;
use crate::provider::api_provider::Provider;
use crate::provider::client::ChatModel;
use crate::provider::error::Error;
use crate::provider::http::{AuthConfig, HttpClient};
use crate::provider::types::{ChatResponse, ClientOptions, Message};
use async_trait::async_trait;

const BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Native Anthropic Messages API client.
pub struct AnthropicClient {
    http: HttpClient,
    model: String,
    options: ClientOptions,
}

impl AnthropicClient {
    /// Create a new Anthropic client.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, Error> {
        let http = HttpClient::new(
            BASE_URL,
            AuthConfig::ApiKey {
                header: "x-api-key".to_string(),
                key: api_key.into(),
            },
        )?
        .with_header("anthropic-version", API_VERSION);

        Ok(Self {
            http,
            model: model.into(),
            options,
        })
    }
}

#[async_trait]
impl ChatModel for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, messages: &[Message]) -> Result<ChatResponse, Error> {
        let request = AnthropicRequest::build(&self.model, messages, self.options);

        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Anthropic API request"
        );

        let response: AnthropicResponse = self.http.post_json("/v1/messages", &request).await?;
        let content = response.text();
        if content.is_empty() {
            return Err(Error::EmptyResponse(Provider::Anthropic.name().to_string()));
        }

        Ok(ChatResponse { content })
    }
}
