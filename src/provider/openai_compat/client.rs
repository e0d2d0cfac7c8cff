//! OpenAI Chat Completions client.

use super::request::OpenAIRequest;
use super::response::OpenAIResponse;
use crate::provider::api_provider::Provider;
use crate::provider::client::ChatModel;
use crate::provider::error::Error;
use crate::provider::http::{AuthConfig, HttpClient};
use crate::provider::types::{ChatResponse, ClientOptions, Message};
use async_trait::async_trait;

const BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAICompatClient {
    http: HttpClient,
    model: String,
    options: ClientOptions,
}

impl OpenAICompatClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, Error> {
        Self::with_base_url(api_key, model, options, BASE_URL)
    }

    /// Create a client against a custom base URL (proxies, compatible servers).
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        options: ClientOptions,
        base_url: impl Into<String>,
    ) -> Result<Self, Error> {
        let http = HttpClient::new(base_url, AuthConfig::Bearer(api_key.into()))?;
        Ok(Self {
            http,
            model: model.into(),
            options,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAICompatClient {
    fn provider(&self) -> Provider {
        Provider::OpenAI
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, messages: &[Message]) -> Result<ChatResponse, Error> {
        let request = OpenAIRequest::build(&self.model, messages, self.options);

        tracing::debug!(
            base_url = %self.http.base_url(),
            model = %request.model,
            messages = request.messages.len(),
            "OpenAI API request"
        );

        let response: OpenAIResponse = self.http.post_json("/chat/completions", &request).await?;
        let content = response
            .text()
            .ok_or_else(|| Error::EmptyResponse(Provider::OpenAI.name().to_string()))?
            .to_string();

        Ok(ChatResponse { content })
    }
}
