//! Chromium-family browser launched as a child process.

use super::{AutomationError, Browser, BrowserContext, BrowserLauncher};
use crate::config::BrowserConfig;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

const DEVTOOLS_PREFIX: &str = "DevTools listening on ";

/// Grace period for the browser process to exit after being killed.
const EXIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Extract the DevTools websocket endpoint from a browser stderr line.
pub fn parse_devtools_line(line: &str) -> Option<&str> {
    let endpoint = line.trim().strip_prefix(DEVTOOLS_PREFIX)?.trim();
    (endpoint.starts_with("ws://") || endpoint.starts_with("wss://")).then_some(endpoint)
}

/// Launches a browser with remote debugging on an ephemeral port.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    executable: String,
    headless: bool,
    args: Vec<String>,
    launch_timeout: Duration,
}

impl ChromiumLauncher {
    pub fn from_config(config: &BrowserConfig) -> Self {
        Self {
            executable: config.executable.clone(),
            headless: config.headless,
            args: config.args.clone(),
            launch_timeout: Duration::from_secs(config.launch_timeout_secs),
        }
    }

    #[must_use]
    pub fn with_launch_timeout(mut self, timeout: Duration) -> Self {
        self.launch_timeout = timeout;
        self
    }

    fn command(&self, profile: &Path) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.args(&self.args)
            .arg("--remote-debugging-port=0")
            .arg(format!("--user-data-dir={}", profile.display()))
            .arg("--no-first-run")
            .arg("--no-default-browser-check");
        if self.headless {
            cmd.arg("--headless=new");
        }
        cmd.arg("about:blank")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn Browser>, AutomationError> {
        let profile = tempfile::Builder::new()
            .prefix("browsework-profile-")
            .tempdir()
            .map_err(|e| AutomationError::Init(format!("failed to create browser profile: {e}")))?;

        let mut child = self.command(profile.path()).spawn().map_err(|e| {
            AutomationError::Init(format!("failed to start '{}': {e}", self.executable))
        })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AutomationError::Init("browser stderr not captured".into()))?;
        let mut lines = BufReader::new(stderr).lines();

        let wait_for_endpoint = async {
            while let Some(line) = lines.next_line().await? {
                if let Some(endpoint) = parse_devtools_line(&line) {
                    return Ok(Some(endpoint.to_string()));
                }
                tracing::trace!(target: "browsework::browser", "{line}");
            }
            Ok::<_, std::io::Error>(None)
        };

        let endpoint = match tokio::time::timeout(self.launch_timeout, wait_for_endpoint).await {
            Ok(Ok(Some(endpoint))) => endpoint,
            Ok(Ok(None)) => {
                let status = tokio::time::timeout(EXIT_TIMEOUT, child.wait())
                    .await
                    .ok()
                    .and_then(Result::ok);
                return Err(AutomationError::Init(match status {
                    Some(status) => format!("browser exited before it was ready ({status})"),
                    None => "browser exited before it was ready".to_string(),
                }));
            }
            Ok(Err(e)) => {
                return Err(AutomationError::Init(format!("failed to read browser output: {e}")));
            }
            Err(_) => {
                let _ = child.start_kill();
                return Err(AutomationError::Init(format!(
                    "browser did not report a DevTools endpoint within {}s",
                    self.launch_timeout.as_secs_f32()
                )));
            }
        };

        // Keep draining stderr so the browser never blocks on a full pipe.
        tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::trace!(target: "browsework::browser", "{line}");
            }
        });

        tracing::debug!(%endpoint, pid = ?child.id(), "Browser launched");

        Ok(Box::new(ChromiumBrowser {
            child,
            endpoint,
            profile: Some(profile),
        }))
    }
}

struct ChromiumBrowser {
    child: Child,
    endpoint: String,
    profile: Option<TempDir>,
}

#[async_trait]
impl Browser for ChromiumBrowser {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn new_context(&self) -> Result<Box<dyn BrowserContext>, AutomationError> {
        let dir = tempfile::Builder::new()
            .prefix("browsework-context-")
            .tempdir()
            .map_err(|e| AutomationError::Init(format!("failed to create context directory: {e}")))?;
        Ok(Box::new(ChromiumContext { dir: Some(dir) }))
    }

    async fn close(&mut self) -> Result<(), AutomationError> {
        if let Err(e) = self.child.start_kill() {
            // Already exited.
            tracing::debug!("Browser kill: {e}");
        }
        match tokio::time::timeout(EXIT_TIMEOUT, self.child.wait()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(AutomationError::Close(format!("browser wait failed: {e}"))),
            Err(_) => return Err(AutomationError::Close("browser did not exit".into())),
        }

        if let Some(profile) = self.profile.take() {
            profile
                .close()
                .map_err(|e| AutomationError::Close(format!("failed to remove browser profile: {e}")))?;
        }
        Ok(())
    }
}

struct ChromiumContext {
    dir: Option<TempDir>,
}

#[async_trait]
impl BrowserContext for ChromiumContext {
    fn workdir(&self) -> &Path {
        self.dir.as_ref().map_or(Path::new("."), TempDir::path)
    }

    async fn close(&mut self) -> Result<(), AutomationError> {
        match self.dir.take() {
            Some(dir) => dir
                .close()
                .map_err(|e| AutomationError::Close(format!("failed to remove context directory: {e}"))),
            None => Ok(()),
        }
    }
}
