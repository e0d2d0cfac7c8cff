//! Shared HTTP utilities for provider clients.

mod client;

pub use client::{AuthConfig, HttpClient};
