//! Shared types for provider clients.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Reply from a chat model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatResponse {
    pub content: String,
}

/// Per-client generation options.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClientOptions {
    /// Sampling temperature; provider default when None.
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ClientOptions {
    /// Deterministic options used for key verification probes.
    #[must_use]
    pub fn deterministic() -> Self {
        Self {
            temperature: Some(0.0),
            max_tokens: Some(16),
        }
    }
}
