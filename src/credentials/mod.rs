//! Credential lifecycle management.
//!
//! A key update is one logical transaction per key:
//! validate → persist → verify → commit, or roll back to the previous value.
//! The store write lock only covers the local file write; the live probe runs
//! after it is released. Updates to the same key are serialized end to end
//! with the store's per-key guard. Once persisted, a transaction runs on its
//! own task, so a caller that goes away cannot strand an unverified key.

mod error;
mod verify;

#[cfg(test)]
mod tests;

pub use error::CredentialError;
pub use verify::{EXPECTED_REPLY, KeyVerifier, PROBE_PROMPT, is_expected_reply};

use crate::provider::{ClientFactory, ProviderConfig, mask_key};
use crate::secrets::SecretStore;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Result of a removal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// Caller did not confirm; nothing was written.
    Cancelled,
}

/// Per-provider status row for display.
#[derive(Debug, Clone)]
pub struct ProviderStatus {
    pub config: &'static ProviderConfig,
    pub masked_key: String,
    pub usable: bool,
    /// Why the provider is unusable, when a key is set but fails verification.
    pub message: Option<String>,
}

/// A credential that passed its usability check when resolved.
pub struct ResolvedCredential {
    pub config: &'static ProviderConfig,
    api_key: String,
}

impl ResolvedCredential {
    /// The checked secret.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for ResolvedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCredential")
            .field("provider", &self.config.name)
            .field("model", &self.config.model)
            .field("api_key", &mask_key(Some(&self.api_key)))
            .finish()
    }
}

/// Orchestrates key updates, removals and status over a [`SecretStore`].
///
/// Holds no resources of its own beyond shared handles.
pub struct CredentialManager {
    store: Arc<SecretStore>,
    verifier: KeyVerifier,
    verify_before_use: bool,
}

impl CredentialManager {
    pub fn new(store: Arc<SecretStore>, factory: Arc<dyn ClientFactory>) -> Self {
        let verifier = KeyVerifier::new(Arc::clone(&store), factory);
        Self {
            store,
            verifier,
            verify_before_use: false,
        }
    }

    /// Also run the live probe in [`client_for`](Self::client_for).
    #[must_use]
    pub fn with_verify_before_use(mut self, enabled: bool) -> Self {
        self.verify_before_use = enabled;
        self
    }

    /// Look up a registry entry.
    pub fn config(id: &str) -> Result<&'static ProviderConfig, CredentialError> {
        ProviderConfig::get(id).ok_or_else(|| CredentialError::UnknownProvider(id.to_string()))
    }

    /// Masked form of the stored key.
    pub fn masked_key(&self, id: &str) -> Result<String, CredentialError> {
        let config = Self::config(id)?;
        Ok(mask_key(self.store.get(config.key_env).as_deref()))
    }

    /// Whether a non-empty key is stored for the provider.
    pub fn has_key(&self, id: &str) -> Result<bool, CredentialError> {
        let config = Self::config(id)?;
        Ok(self
            .store
            .get(config.key_env)
            .is_some_and(|k| !k.is_empty()))
    }

    /// Derived status: key present and format-valid. No network.
    pub fn is_usable(&self, id: &str) -> bool {
        Self::config(id).is_ok_and(|config| self.verifier.stored_key(config).is_ok())
    }

    /// Live-verify the stored key for a provider.
    pub async fn verify(&self, id: &str) -> Result<String, CredentialError> {
        self.verifier.verify(id).await
    }

    /// Replace a provider's key, keeping it only if it verifies.
    ///
    /// On verification failure the previous key is restored if it was itself
    /// format-valid; otherwise the key is cleared. The new value never
    /// survives a failed verification. Dropping the returned future after
    /// the key guard is taken detaches the transaction; it still finishes.
    pub async fn update(&self, id: &str, new_value: &str) -> Result<String, CredentialError> {
        let config = Self::config(id)?;
        let new_value = new_value.trim().to_string();

        if !new_value.is_empty() && !config.provider.is_valid_key(&new_value) {
            return Err(CredentialError::InvalidFormat {
                provider: config.provider.name(),
            });
        }

        let txn = self.store.lock_key(config.key_env).await;
        let update = KeyUpdate {
            store: Arc::clone(&self.store),
            verifier: self.verifier.clone(),
            config,
        };
        let handle = tokio::spawn(async move {
            let _txn = txn;
            update.run(&new_value).await
        });

        match handle.await {
            Ok(result) => result,
            Err(join_err) => {
                let message = if join_err.is_panic() {
                    "update task panicked"
                } else {
                    "update task was cancelled"
                };
                tracing::error!(provider = %config.name, "{message}");
                Err(CredentialError::VerificationFailure {
                    name: config.name,
                    message: message.to_string(),
                })
            }
        }
    }

    /// Wait for in-flight key updates to finish.
    pub async fn settle(&self) {
        for config in ProviderConfig::REGISTRY {
            drop(self.store.lock_key(config.key_env).await);
        }
    }

    /// Clear a provider's key. Nothing is written unless `confirmed`.
    pub async fn remove(&self, id: &str, confirmed: bool) -> Result<RemoveOutcome, CredentialError> {
        let config = Self::config(id)?;
        if !confirmed {
            tracing::debug!(provider = %config.name, "API key removal cancelled");
            return Ok(RemoveOutcome::Cancelled);
        }

        let _txn = self.store.lock_key(config.key_env).await;
        self.store
            .set_atomic(config.key_env, "")
            .await
            .map_err(|source| CredentialError::PersistenceFailure {
                name: config.name,
                source,
            })?;

        tracing::info!(provider = %config.name, "API key removed");
        Ok(RemoveOutcome::Removed)
    }

    /// Live usability of every registered provider.
    ///
    /// Providers without a stored key are unusable without a network call.
    /// Results are never cached between calls.
    pub async fn list_statuses(&self) -> BTreeMap<&'static str, bool> {
        self.status_report()
            .await
            .into_iter()
            .map(|status| (status.config.id, status.usable))
            .collect()
    }

    /// Status rows for every registered provider, verified live.
    pub async fn status_report(&self) -> Vec<ProviderStatus> {
        let checks = ProviderConfig::REGISTRY.iter().map(|config| async move {
            let stored = self.store.get(config.key_env).filter(|k| !k.is_empty());
            let masked_key = mask_key(stored.as_deref());

            if stored.is_none() {
                return ProviderStatus {
                    config,
                    masked_key,
                    usable: false,
                    message: None,
                };
            }

            match self.verifier.verify(config.id).await {
                Ok(_) => ProviderStatus {
                    config,
                    masked_key,
                    usable: true,
                    message: None,
                },
                Err(e) => {
                    tracing::warn!(provider = %config.name, "{e}");
                    ProviderStatus {
                        config,
                        masked_key,
                        usable: false,
                        message: Some(e.to_string()),
                    }
                }
            }
        });

        join_all(checks).await
    }

    /// Resolve the current key for a provider.
    ///
    /// Usability is re-checked now (presence, then format, then the live
    /// probe when enabled), never taken from an earlier status listing.
    pub async fn client_for(&self, id: &str) -> Result<ResolvedCredential, CredentialError> {
        let config = Self::config(id)?;
        let api_key = self.verifier.stored_key(config)?;

        if self.verify_before_use {
            self.verifier.verify(id).await?;
        }

        Ok(ResolvedCredential { config, api_key })
    }
}

/// One persisted-then-verified key replacement, run while its key guard is held.
struct KeyUpdate {
    store: Arc<SecretStore>,
    verifier: KeyVerifier,
    config: &'static ProviderConfig,
}

impl KeyUpdate {
    async fn run(&self, new_value: &str) -> Result<String, CredentialError> {
        let config = self.config;

        // Rollback target.
        let old_value = self.store.get(config.key_env);

        self.store
            .set_atomic(config.key_env, new_value)
            .await
            .map_err(|source| {
                tracing::error!(provider = %config.name, "Error updating secret store: {source}");
                CredentialError::PersistenceFailure {
                    name: config.name,
                    source,
                }
            })?;

        tracing::info!(provider = %config.name, key = %mask_key(Some(new_value)), "Testing API key");

        match self.verifier.verify(config.id).await {
            Ok(message) => {
                tracing::info!(provider = %config.name, "API key updated and verified");
                Ok(message)
            }
            Err(err) => {
                let message = match err {
                    CredentialError::VerificationFailure { message, .. } => message,
                    other => other.to_string(),
                };
                self.roll_back(old_value.as_deref(), message).await
            }
        }
    }

    async fn roll_back(&self, old_value: Option<&str>, message: String) -> Result<String, CredentialError> {
        let config = self.config;
        let restore = old_value
            .filter(|old| config.provider.is_valid_key(old))
            .unwrap_or("");

        tracing::warn!(
            provider = %config.name,
            restored = %mask_key(Some(restore)),
            "Verification failed, reverting API key: {message}"
        );

        if let Err(source) = self.store.set_atomic(config.key_env, restore).await {
            tracing::error!(provider = %config.name, "Failed to revert API key: {source}");
            return Err(CredentialError::RollbackFailure {
                name: config.name,
                verification: message,
                source,
            });
        }

        Err(CredentialError::VerificationFailure {
            name: config.name,
            message,
        })
    }
}
