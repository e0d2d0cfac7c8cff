//! Browser automation session.
//!
//! The session owns one browser and one execution context, created lazily on
//! the first task and reused until shutdown. The browser, its contexts and the
//! agent that drives them are collaborators behind traits.

mod chromium;
mod command_agent;
mod session;

pub use chromium::ChromiumLauncher;
pub use command_agent::CommandAgent;
pub use session::{AutomationSession, SessionState};

use crate::credentials::{CredentialError, ResolvedCredential};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("Failed to initialize browser: {0}")]
    Init(String),

    #[error("Credential unavailable: {0}")]
    CredentialUnavailable(#[source] CredentialError),

    #[error("Task failed: {0}")]
    Task(String),

    #[error("Failed to close browser resource: {0}")]
    Close(String),
}

/// Out-of-band output of a task run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// Progress or completion message.
    Message(String),
    /// Location of a result artifact (e.g. a recorded trace).
    Artifact(PathBuf),
}

/// Starts browser instances.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn Browser>, AutomationError>;
}

/// A running browser.
#[async_trait]
pub trait Browser: Send + Sync {
    /// DevTools endpoint agents connect to.
    fn endpoint(&self) -> &str;
    /// Open an isolated execution context.
    async fn new_context(&self) -> Result<Box<dyn BrowserContext>, AutomationError>;
    async fn close(&mut self) -> Result<(), AutomationError>;
}

/// An execution context inside a browser.
#[async_trait]
pub trait BrowserContext: Send + Sync {
    /// Scratch directory for downloads and intermediate files.
    fn workdir(&self) -> &Path;
    async fn close(&mut self) -> Result<(), AutomationError>;
}

/// Everything an agent needs to carry out one task.
pub struct AgentTask<'a> {
    pub description: &'a str,
    pub credential: &'a ResolvedCredential,
    pub browser: &'a dyn Browser,
    pub context: &'a dyn BrowserContext,
    /// Where the agent should leave its recorded trace, if it records one.
    pub artifact_path: &'a Path,
    pub events: &'a mpsc::Sender<TaskEvent>,
}

/// Performs a task with a browser and a model.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(&self, task: AgentTask<'_>) -> Result<(), AutomationError>;
}
