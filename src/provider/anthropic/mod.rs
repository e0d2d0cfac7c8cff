//! Native Anthropic Messages API client.

mod client;
mod request;
mod response;

pub use client::AnthropicClient;
