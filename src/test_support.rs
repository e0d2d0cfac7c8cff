//! Stub collaborators shared by unit tests.

use crate::automation::{
    AgentRunner, AgentTask, AutomationError, Browser, BrowserContext, BrowserLauncher,
};
use crate::provider::{ChatModel, ChatResponse, ClientFactory, ClientOptions, Error, Message, Provider, ProviderConfig};
use crate::secrets::SecretStore;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// How stub models answer the verification probe.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Always reply "OK".
    Ok,
    /// Reply "OK" only when the key contains this marker.
    OkIfKeyContains(&'static str),
    /// Reply with fixed text.
    Text(&'static str),
    /// Fail the request.
    Fail(&'static str),
    /// Fail client construction.
    BuildFail,
}

pub struct StubFactory {
    reply: Reply,
    delay: Duration,
    pub created: AtomicUsize,
    pub invoked: Arc<AtomicUsize>,
    pub last_options: Mutex<Option<ClientOptions>>,
}

impl StubFactory {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self::build(reply, Duration::ZERO))
    }

    pub fn with_delay(reply: Reply, delay: Duration) -> Arc<Self> {
        Arc::new(Self::build(reply, delay))
    }

    fn build(reply: Reply, delay: Duration) -> Self {
        Self {
            reply,
            delay,
            created: AtomicUsize::new(0),
            invoked: Arc::new(AtomicUsize::new(0)),
            last_options: Mutex::new(None),
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn invoked(&self) -> usize {
        self.invoked.load(Ordering::SeqCst)
    }
}

impl ClientFactory for StubFactory {
    fn create(
        &self,
        config: &ProviderConfig,
        api_key: &str,
        options: ClientOptions,
    ) -> Result<Arc<dyn ChatModel>, Error> {
        self.created.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock().unwrap() = Some(options);
        if matches!(self.reply, Reply::BuildFail) {
            return Err(Error::Build {
                provider: config.provider.name().to_string(),
                reason: "stub refused".into(),
            });
        }
        Ok(Arc::new(StubModel {
            provider: config.provider,
            model: config.model.to_string(),
            api_key: api_key.to_string(),
            reply: self.reply.clone(),
            delay: self.delay,
            invoked: Arc::clone(&self.invoked),
        }))
    }
}

struct StubModel {
    provider: Provider,
    model: String,
    api_key: String,
    reply: Reply,
    delay: Duration,
    invoked: Arc<AtomicUsize>,
}

#[async_trait]
impl ChatModel for StubModel {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, _messages: &[Message]) -> Result<ChatResponse, Error> {
        self.invoked.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let content = match &self.reply {
            Reply::Ok => "OK",
            Reply::OkIfKeyContains(marker) if self.api_key.contains(marker) => "OK",
            Reply::OkIfKeyContains(_) => "Nope",
            Reply::Text(text) => *text,
            Reply::Fail(reason) => return Err(Error::Api((*reason).to_string())),
            Reply::BuildFail => unreachable!(),
        };
        Ok(ChatResponse {
            content: content.to_string(),
        })
    }
}

/// Store in a fresh temp dir, optionally seeded with file content.
pub fn temp_store(content: &str) -> (TempDir, PathBuf, Arc<SecretStore>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".env");
    std::fs::write(&path, content).unwrap();
    let store = Arc::new(SecretStore::open(&path).unwrap());
    (dir, path, store)
}

/// Counters observed by stub browser collaborators.
#[derive(Debug, Default)]
pub struct Counters {
    pub launches: AtomicUsize,
    pub contexts: AtomicUsize,
    pub browser_closes: AtomicUsize,
    pub context_closes: AtomicUsize,
    pub runs: AtomicUsize,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct StubLauncher {
    pub counters: Arc<Counters>,
    pub fail_launch: bool,
    pub fail_context: bool,
    pub fail_close: bool,
    pub launch_delay: Duration,
}

#[async_trait]
impl BrowserLauncher for StubLauncher {
    async fn launch(&self) -> Result<Box<dyn Browser>, AutomationError> {
        if !self.launch_delay.is_zero() {
            tokio::time::sleep(self.launch_delay).await;
        }
        if self.fail_launch {
            return Err(AutomationError::Init("no browser binary".into()));
        }
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubBrowser {
            counters: Arc::clone(&self.counters),
            fail_context: self.fail_context,
            fail_close: self.fail_close,
        }))
    }
}

struct StubBrowser {
    counters: Arc<Counters>,
    fail_context: bool,
    fail_close: bool,
}

#[async_trait]
impl Browser for StubBrowser {
    fn endpoint(&self) -> &str {
        "ws://127.0.0.1:9222/devtools/browser/stub"
    }

    async fn new_context(&self) -> Result<Box<dyn BrowserContext>, AutomationError> {
        if self.fail_context {
            return Err(AutomationError::Init("context refused".into()));
        }
        self.counters.contexts.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubContext {
            counters: Arc::clone(&self.counters),
            fail_close: self.fail_close,
        }))
    }

    async fn close(&mut self) -> Result<(), AutomationError> {
        self.counters.browser_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct StubContext {
    counters: Arc<Counters>,
    fail_close: bool,
}

#[async_trait]
impl BrowserContext for StubContext {
    fn workdir(&self) -> &Path {
        Path::new(".")
    }

    async fn close(&mut self) -> Result<(), AutomationError> {
        self.counters.context_closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(AutomationError::Close("context already gone".into()));
        }
        Ok(())
    }
}

/// Agent stub that optionally fails or writes an artifact.
#[derive(Default)]
pub struct StubAgent {
    pub counters: Arc<Counters>,
    pub fail_with: Option<&'static str>,
    pub artifact: Option<PathBuf>,
    pub seen_tasks: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl AgentRunner for StubAgent {
    async fn run(&self, task: AgentTask<'_>) -> Result<(), AutomationError> {
        self.counters.runs.fetch_add(1, Ordering::SeqCst);
        self.seen_tasks
            .lock()
            .unwrap()
            .push((task.description.to_string(), task.credential.config.id.to_string()));
        if let Some(reason) = self.fail_with {
            return Err(AutomationError::Task(reason.to_string()));
        }
        if let Some(path) = &self.artifact {
            std::fs::write(path, b"GIF89a").map_err(|e| AutomationError::Task(e.to_string()))?;
        }
        Ok(())
    }
}
