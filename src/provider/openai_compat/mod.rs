//! OpenAI Chat Completions client.

mod client;
mod request;
mod response;

pub use client::OpenAICompatClient;
