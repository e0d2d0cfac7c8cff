//! Agent that runs an external program per task.

use super::{AgentRunner, AgentTask, AutomationError, TaskEvent};
use crate::config::AgentConfig;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Stderr lines kept for the failure message.
const STDERR_TAIL: usize = 20;

/// Runs `program args... <task>` with the session wired in through the
/// environment:
///
/// | variable                | value                              |
/// |-------------------------|------------------------------------|
/// | `BROWSER_CDP_URL`       | DevTools endpoint of the browser   |
/// | `BROWSER_WORKDIR`       | context scratch directory          |
/// | `BROWSER_ARTIFACT_PATH` | where to write the recorded trace  |
/// | `BROWSER_TASK`          | task description                   |
/// | `LLM_PROVIDER`          | vendor name                        |
/// | `LLM_MODEL`             | model identifier                   |
/// | provider key name       | API key (e.g. `OPENAI_API_KEY`)    |
///
/// Each stdout line becomes a task message. The child is killed if the
/// task future is dropped.
#[derive(Debug, Clone)]
pub struct CommandAgent {
    program: String,
    args: Vec<String>,
}

impl CommandAgent {
    pub fn new(command: &[String]) -> Result<Self, AutomationError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| AutomationError::Init("agent command is empty".into()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    pub fn from_config(config: &AgentConfig) -> Result<Self, AutomationError> {
        Self::new(&config.command)
    }
}

#[async_trait]
impl AgentRunner for CommandAgent {
    async fn run(&self, task: AgentTask<'_>) -> Result<(), AutomationError> {
        let config = task.credential.config;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(task.description)
            .env("BROWSER_CDP_URL", task.browser.endpoint())
            .env("BROWSER_WORKDIR", task.context.workdir())
            .env("BROWSER_ARTIFACT_PATH", task.artifact_path)
            .env("BROWSER_TASK", task.description)
            .env("LLM_PROVIDER", config.provider.name())
            .env("LLM_MODEL", config.model)
            .env(config.key_env, task.credential.api_key())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AutomationError::Task(format!("failed to start agent '{}': {e}", self.program)))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let forward_stdout = async {
            let Some(stdout) = stdout else { return };
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let line = line.trim_end();
                if line.is_empty() {
                    continue;
                }
                if task.events.send(TaskEvent::Message(line.to_string())).await.is_err() {
                    tracing::debug!("Task event receiver dropped");
                }
            }
        };

        let collect_stderr = async {
            let mut tail = VecDeque::with_capacity(STDERR_TAIL);
            let Some(stderr) = stderr else { return tail };
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(target: "browsework::agent", "{line}");
                if tail.len() == STDERR_TAIL {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            tail
        };

        let ((), tail) = tokio::join!(forward_stdout, collect_stderr);

        let status = child
            .wait()
            .await
            .map_err(|e| AutomationError::Task(format!("failed to wait for agent: {e}")))?;

        if status.success() {
            return Ok(());
        }

        let detail = tail.iter().rev().find(|l| !l.trim().is_empty());
        Err(AutomationError::Task(match detail {
            Some(line) => format!("agent exited with {status}: {}", line.trim()),
            None => format!("agent exited with {status}"),
        }))
    }
}
