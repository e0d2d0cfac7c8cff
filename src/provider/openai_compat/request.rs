//! OpenAI Chat Completions request types.

use crate::provider::types::{ClientOptions, Message, Role};
use serde::Serialize;

/// Top-level request to the chat completions endpoint.
#[derive(Debug, Serialize)]
pub struct OpenAIRequest {
    pub model: String,
    pub messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct OpenAIMessage {
    pub role: &'static str,
    pub content: String,
}

impl OpenAIRequest {
    pub fn build(model: &str, messages: &[Message], options: ClientOptions) -> Self {
        let messages = messages
            .iter()
            .map(|msg| OpenAIMessage {
                role: match msg.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content: msg.content.clone(),
            })
            .collect();

        Self {
            model: model.to_string(),
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        }
    }
}
