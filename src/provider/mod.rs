//! Model provider abstraction.
//!
//! A small registry of providers (Google, Anthropic, `OpenAI`), each with its
//! own key-format rule and a native HTTP client implementing [`ChatModel`].
//!
//! # Example
//!
//! ```ignore
//! use browsework::provider::{ClientFactory, ClientOptions, HttpClientFactory, Message, ProviderConfig};
//!
//! let config = ProviderConfig::get("1").unwrap();
//! let model = HttpClientFactory.create(config, &api_key, ClientOptions::default())?;
//! let reply = model.invoke(&[Message::user("Hello")]).await?;
//! ```

mod anthropic;
mod api_provider;
mod client;
mod error;
mod gemini;
mod http;
mod openai_compat;
mod types;

pub use api_provider::{Provider, ProviderConfig, is_valid_format, mask_key};
pub use client::{ChatModel, ClientFactory, HttpClientFactory};
pub use error::{Error, format_api_error};
pub use types::*;
