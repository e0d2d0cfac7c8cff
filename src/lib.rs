#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod app;
pub mod automation;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod menu;
pub mod provider;
pub mod secrets;

#[cfg(test)]
mod test_support;
