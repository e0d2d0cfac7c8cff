//! Application wiring: store, credential manager and automation session.

use crate::automation::{
    AgentRunner, AutomationSession, BrowserLauncher, ChromiumLauncher, CommandAgent,
};
use crate::config::Config;
use crate::credentials::CredentialManager;
use crate::error::Result;
use crate::provider::{ClientFactory, HttpClientFactory, ProviderConfig};
use crate::secrets::SecretStore;
use std::sync::Arc;

/// Long-lived components shared by the CLI and the interactive menu.
pub struct App {
    pub config: Config,
    pub credentials: Arc<CredentialManager>,
    pub session: Arc<AutomationSession>,
}

impl App {
    /// Build from config with the real browser, agent and HTTP clients.
    pub fn new(config: Config) -> Result<Self> {
        let launcher = Arc::new(ChromiumLauncher::from_config(&config.browser));
        let agent = Arc::new(CommandAgent::from_config(&config.agent)?);
        Self::with_parts(config, Arc::new(HttpClientFactory), launcher, agent)
    }

    /// Build from config with the given collaborators.
    pub fn with_parts(
        config: Config,
        factory: Arc<dyn ClientFactory>,
        launcher: Arc<dyn BrowserLauncher>,
        agent: Arc<dyn AgentRunner>,
    ) -> Result<Self> {
        let mut store = SecretStore::open(&config.env_file)?;
        if config.import_env {
            store = store.with_env_fallback(ProviderConfig::key_names());
        }
        tracing::debug!(path = %store.path().display(), "Secret store opened");

        let credentials = Arc::new(
            CredentialManager::new(Arc::new(store), factory)
                .with_verify_before_use(config.verify_before_task),
        );
        let session = Arc::new(AutomationSession::new(
            launcher,
            agent,
            Arc::clone(&credentials),
            &config.artifact_path,
        ));

        Ok(Self {
            config,
            credentials,
            session,
        })
    }

    /// Let in-flight key updates finish, then release browser resources.
    pub async fn shutdown(&self) {
        self.credentials.settle().await;
        self.session.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::SessionState;
    use crate::test_support::{Reply, StubAgent, StubFactory, StubLauncher};

    fn config_in(dir: &std::path::Path) -> Config {
        Config {
            env_file: dir.join("keys").join(".env"),
            import_env: false,
            artifact_path: dir.join("agent_history.gif"),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_wiring_creates_store_and_lazy_session() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let app = App::with_parts(
            config.clone(),
            StubFactory::new(Reply::Ok),
            Arc::new(StubLauncher::default()),
            Arc::new(StubAgent::default()),
        )
        .unwrap();

        assert!(config.env_file.exists());
        assert_eq!(app.session.state().await, SessionState::Uninitialized);
        assert!(!app.credentials.has_key("1").unwrap());

        app.shutdown().await;
        assert_eq!(app.session.state().await, SessionState::Closed);
    }

    #[test]
    fn test_empty_agent_command_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.agent.command.clear();
        assert!(App::new(config).is_err());
    }
}
