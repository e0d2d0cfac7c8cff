//! Chat model abstraction and client construction.

use super::anthropic::AnthropicClient;
use super::api_provider::{Provider, ProviderConfig};
use super::error::Error;
use super::gemini::GeminiClient;
use super::openai_compat::OpenAICompatClient;
use super::types::{ChatResponse, ClientOptions, Message};
use async_trait::async_trait;
use std::sync::Arc;

/// A chat model bound to one provider, model and credential.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Provider serving this model.
    fn provider(&self) -> Provider;
    /// Model identifier.
    fn model(&self) -> &str;
    /// Send a conversation and return the reply.
    async fn invoke(&self, messages: &[Message]) -> Result<ChatResponse, Error>;
}

/// Constructs chat models for registry entries.
pub trait ClientFactory: Send + Sync {
    fn create(
        &self,
        config: &ProviderConfig,
        api_key: &str,
        options: ClientOptions,
    ) -> Result<Arc<dyn ChatModel>, Error>;
}

/// Factory producing the native HTTP clients.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpClientFactory;

impl ClientFactory for HttpClientFactory {
    fn create(
        &self,
        config: &ProviderConfig,
        api_key: &str,
        options: ClientOptions,
    ) -> Result<Arc<dyn ChatModel>, Error> {
        let model: Arc<dyn ChatModel> = match config.provider {
            Provider::Google => Arc::new(GeminiClient::new(api_key, config.model, options)?),
            Provider::Anthropic => Arc::new(AnthropicClient::new(api_key, config.model, options)?),
            Provider::OpenAI => Arc::new(OpenAICompatClient::new(api_key, config.model, options)?),
        };
        Ok(model)
    }
}
