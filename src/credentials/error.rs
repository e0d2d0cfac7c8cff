use crate::secrets::StoreError;
use thiserror::Error;

/// Errors surfaced by credential operations.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Invalid {provider} API key format")]
    InvalidFormat { provider: &'static str },

    #[error("Failed to save API key for {name}: {source}")]
    PersistenceFailure {
        name: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("API key verification failed for {name}: {message}")]
    VerificationFailure { name: &'static str, message: String },

    #[error("No API key found for {name}")]
    NoKeyConfigured { name: &'static str },

    #[error("API key verification failed for {name} ({verification}) and the previous key could not be restored: {source}")]
    RollbackFailure {
        name: &'static str,
        verification: String,
        #[source]
        source: StoreError,
    },
}
