//! Google Generative Language API client (AI Studio keys).

mod client;
mod types;

pub use client::GeminiClient;
