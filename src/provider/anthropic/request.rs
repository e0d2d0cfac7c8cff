//! Anthropic API request types.

use crate::provider::types::{ClientOptions, Message, Role};
use serde::Serialize;

/// Anthropic requires `max_tokens` on every request.
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Top-level request to the Anthropic Messages API.
#[derive(Debug, Serialize)]
pub struct AnthropicRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// A message in the conversation.
#[derive(Debug, Serialize)]
pub struct AnthropicMessage {
    pub role: &'static str,
    pub content: String,
}

impl AnthropicRequest {
    /// Build a request; system messages are hoisted into the `system` field.
    pub fn build(model: &str, messages: &[Message], options: ClientOptions) -> Self {
        let mut system = Vec::new();
        let mut converted = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => system.push(msg.content.as_str()),
                Role::User => converted.push(AnthropicMessage {
                    role: "user",
                    content: msg.content.clone(),
                }),
                Role::Assistant => converted.push(AnthropicMessage {
                    role: "assistant",
                    content: msg.content.clone(),
                }),
            }
        }

        Self {
            model: model.to_string(),
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages: converted,
            temperature: options.temperature,
        }
    }
}
