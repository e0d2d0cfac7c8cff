//! Live key verification.

use super::CredentialError;
use crate::provider::{
    ClientFactory, ClientOptions, Message, ProviderConfig, format_api_error,
};
use crate::secrets::SecretStore;
use std::sync::Arc;

/// Probe sent to the provider.
pub const PROBE_PROMPT: &str = "Respond with exactly 'OK' and nothing else";
/// Reply expected from the probe.
pub const EXPECTED_REPLY: &str = "OK";

/// Whether a probe reply is the expected token.
///
/// Surrounding whitespace, quotes, backticks and a trailing period are
/// ignored; anything else must match exactly.
pub fn is_expected_reply(content: &str) -> bool {
    let trimmed = content
        .trim()
        .trim_end_matches('.')
        .trim_matches(|c| matches!(c, '"' | '\'' | '`'))
        .trim();
    trimmed == EXPECTED_REPLY
}

/// Checks stored keys: presence, then format, then a live probe.
#[derive(Clone)]
pub struct KeyVerifier {
    store: Arc<SecretStore>,
    factory: Arc<dyn ClientFactory>,
}

impl KeyVerifier {
    pub fn new(store: Arc<SecretStore>, factory: Arc<dyn ClientFactory>) -> Self {
        Self { store, factory }
    }

    /// Presence and format check of the stored key. No network.
    pub fn stored_key(&self, config: &'static ProviderConfig) -> Result<String, CredentialError> {
        let key = self
            .store
            .get(config.key_env)
            .filter(|k| !k.is_empty())
            .ok_or(CredentialError::NoKeyConfigured { name: config.name })?;

        if !config.provider.is_valid_key(&key) {
            return Err(CredentialError::InvalidFormat {
                provider: config.provider.name(),
            });
        }

        Ok(key)
    }

    /// Verify the stored key for a provider id with a deterministic probe.
    ///
    /// Returns a success message, or the reason the key is unusable.
    pub async fn verify(&self, id: &str) -> Result<String, CredentialError> {
        let config =
            ProviderConfig::get(id).ok_or_else(|| CredentialError::UnknownProvider(id.to_string()))?;
        let key = self.stored_key(config)?;

        let failure = |message: String| CredentialError::VerificationFailure {
            name: config.name,
            message,
        };

        let model = self
            .factory
            .create(config, &key, ClientOptions::deterministic())
            .map_err(|e| {
                tracing::error!(provider = %config.name, "Error initializing client for verification: {e}");
                failure(format!("error initializing client: {e}"))
            })?;

        tracing::debug!(provider = %config.name, model = %config.model, "Verifying API key");

        let response = model
            .invoke(&[Message::user(PROBE_PROMPT)])
            .await
            .map_err(|e| {
                tracing::error!(provider = %config.name, "API key verification request failed: {e}");
                failure(format_api_error(&e.to_string()))
            })?;

        if is_expected_reply(&response.content) {
            Ok("API key verified successfully".to_string())
        } else {
            tracing::warn!(provider = %config.name, reply_len = response.content.len(), "Unexpected verification reply");
            Err(failure("unexpected response".to_string()))
        }
    }
}
