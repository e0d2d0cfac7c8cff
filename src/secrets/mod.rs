//! Secret persistence.
//!
//! Provider API keys live in a line-oriented `KEY=value` file owned by a
//! [`SecretStore`]. The store is the only way the rest of the crate reads or
//! writes secrets; nothing reads provider keys from the process environment
//! directly.

mod env_file;
mod store;

pub use env_file::EnvFile;
pub use store::{SecretStore, StoreError};
