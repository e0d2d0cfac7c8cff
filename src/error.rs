use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider error: {0}")]
    Provider(#[from] crate::provider::Error),

    #[error("Secret store error: {0}")]
    Store(#[from] crate::secrets::StoreError),

    #[error(transparent)]
    Credential(#[from] crate::credentials::CredentialError),

    #[error(transparent)]
    Automation(#[from] crate::automation::AutomationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
