use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides `env_file`.
pub const ENV_FILE_VAR: &str = "BROWSEWORK_ENV_FILE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dotenv-style file holding provider keys.
    pub env_file: PathBuf,
    /// Seed keys missing from `env_file` from the process environment.
    pub import_env: bool,
    /// Where the agent leaves its recorded trace.
    pub artifact_path: PathBuf,
    /// Log file; empty disables file logging.
    pub log_file: PathBuf,
    /// Live-verify the key before every task.
    pub verify_before_task: bool,

    pub browser: BrowserConfig,
    pub agent: AgentConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            env_file: PathBuf::from(".env"),
            import_env: true,
            artifact_path: PathBuf::from("agent_history.gif"),
            log_file: PathBuf::from("app.log"),
            verify_before_task: false,
            browser: BrowserConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub executable: String,
    pub headless: bool,
    /// Seconds to wait for the DevTools endpoint.
    pub launch_timeout_secs: u64,
    /// Extra command-line flags.
    pub args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable: "chromium".to_string(),
            headless: false,
            launch_timeout_secs: 30,
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Program and leading arguments; the task is appended.
    pub command: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: vec!["browser-agent".to_string()],
        }
    }
}

impl Config {
    /// Default config file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("browsework"))
            .unwrap_or_else(|| PathBuf::from(".browsework"))
            .join("config.toml")
    }

    /// Load from `path`, or the default location. A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("{}: {e}", config_path.display()))?
        } else if path.is_some() {
            anyhow::bail!("config file not found: {}", config_path.display());
        } else {
            Config::default()
        };

        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply environment overrides through `var`.
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(env_file) = var(ENV_FILE_VAR).filter(|v| !v.trim().is_empty()) {
            self.env_file = PathBuf::from(env_file.trim());
        }
    }

    /// Log file path, if file logging is enabled.
    pub fn log_path(&self) -> Option<&Path> {
        (!self.log_file.as_os_str().is_empty()).then_some(self.log_file.as_path())
    }
}
