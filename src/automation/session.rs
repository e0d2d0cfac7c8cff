//! Lazily initialized, reusable browser session.

use super::{
    AgentRunner, AgentTask, AutomationError, Browser, BrowserContext, BrowserLauncher, TaskEvent,
};
use crate::credentials::CredentialManager;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    Closed,
}

enum Resources {
    Uninitialized,
    Ready {
        browser: Box<dyn Browser>,
        context: Box<dyn BrowserContext>,
    },
    Closed,
}

/// Owns the browser/context pair and runs tasks against it.
///
/// The state mutex doubles as the initialization lock: concurrent callers
/// queue on it and only the first performs the real launch. Tasks also run
/// under it, so one task executes at a time.
pub struct AutomationSession {
    launcher: Arc<dyn BrowserLauncher>,
    agent: Arc<dyn AgentRunner>,
    credentials: Arc<CredentialManager>,
    artifact_path: PathBuf,
    resources: Mutex<Resources>,
}

impl AutomationSession {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        agent: Arc<dyn AgentRunner>,
        credentials: Arc<CredentialManager>,
        artifact_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            launcher,
            agent,
            credentials,
            artifact_path: artifact_path.into(),
            resources: Mutex::new(Resources::Uninitialized),
        }
    }

    pub async fn state(&self) -> SessionState {
        match &*self.resources.lock().await {
            Resources::Uninitialized => SessionState::Uninitialized,
            Resources::Ready { .. } => SessionState::Ready,
            Resources::Closed => SessionState::Closed,
        }
    }

    /// Launch the browser and open a context unless already ready.
    ///
    /// A closed session is initialized again.
    pub async fn ensure_ready(&self) -> Result<(), AutomationError> {
        let mut resources = self.resources.lock().await;
        self.initialize(&mut resources).await
    }

    async fn initialize(&self, resources: &mut Resources) -> Result<(), AutomationError> {
        if matches!(resources, Resources::Ready { .. }) {
            return Ok(());
        }

        let mut browser = self.launcher.launch().await.map_err(|e| {
            tracing::error!("Error initializing browser: {e}");
            into_init(e)
        })?;

        let context = match browser.new_context().await {
            Ok(context) => context,
            Err(e) => {
                tracing::error!("Error creating browser context: {e}");
                if let Err(close_err) = browser.close().await {
                    tracing::warn!("Error closing partially initialized browser: {close_err}");
                }
                return Err(into_init(e));
            }
        };

        tracing::info!(endpoint = %browser.endpoint(), "Browser and context initialized successfully");
        *resources = Resources::Ready { browser, context };
        Ok(())
    }

    /// Run one task with the given provider.
    ///
    /// The credential is resolved when the task starts. A failed task leaves
    /// the session ready for the next one.
    pub async fn run_task(
        &self,
        task: &str,
        provider_id: &str,
        events: &mpsc::Sender<TaskEvent>,
    ) -> Result<(), AutomationError> {
        let task = task.trim();
        if task.is_empty() {
            return Err(AutomationError::Task("Task cannot be empty".into()));
        }

        let credential = self
            .credentials
            .client_for(provider_id)
            .await
            .map_err(AutomationError::CredentialUnavailable)?;

        let mut resources = self.resources.lock().await;
        self.initialize(&mut resources).await?;
        let Resources::Ready { browser, context } = &*resources else {
            return Err(AutomationError::Init("browser session is not ready".into()));
        };

        self.clear_artifact();

        tracing::info!(
            provider = %credential.config.name,
            model = %credential.config.model,
            "Starting task execution"
        );

        let run = self
            .agent
            .run(AgentTask {
                description: task,
                credential: &credential,
                browser: browser.as_ref(),
                context: context.as_ref(),
                artifact_path: &self.artifact_path,
                events,
            })
            .await;

        if let Err(e) = run {
            tracing::error!("Error during task execution: {e}");
            return Err(match e {
                AutomationError::Task(_) => e,
                other => AutomationError::Task(other.to_string()),
            });
        }

        let _ = events
            .send(TaskEvent::Message("Task executed successfully".to_string()))
            .await;

        if let Some(path) = self.artifact() {
            tracing::debug!(path = %path.display(), "Task produced artifact");
            let _ = events.send(TaskEvent::Artifact(path)).await;
        }

        tracing::info!("Task completed successfully");
        Ok(())
    }

    /// Remove the previous run's artifact so one found afterwards is this run's.
    fn clear_artifact(&self) {
        match std::fs::remove_file(&self.artifact_path) {
            Ok(()) => tracing::debug!(path = %self.artifact_path.display(), "Removed previous artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.artifact_path.display(), "Failed to remove previous artifact: {e}"),
        }
    }

    /// Absolute artifact path, if the file exists.
    fn artifact(&self) -> Option<PathBuf> {
        if !self.artifact_path.is_file() {
            return None;
        }
        Some(std::path::absolute(&self.artifact_path).unwrap_or_else(|_| self.artifact_path.clone()))
    }

    /// Close the context, then the browser. Idempotent and never fails.
    pub async fn shutdown(&self) {
        let mut resources = self.resources.lock().await;
        let previous = std::mem::replace(&mut *resources, Resources::Closed);

        if let Resources::Ready {
            mut browser,
            mut context,
        } = previous
        {
            if let Err(e) = context.close().await {
                tracing::error!("Error closing browser context: {e}");
            }
            if let Err(e) = browser.close().await {
                tracing::error!("Error closing browser: {e}");
            }
            tracing::info!("Browser resources cleaned up");
        }
    }
}

fn into_init(err: AutomationError) -> AutomationError {
    match err {
        AutomationError::Init(_) => err,
        other => AutomationError::Init(other.to_string()),
    }
}
