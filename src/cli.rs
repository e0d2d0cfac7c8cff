//! Command-line surface: one-shot task runs and key management.

use crate::app::App;
use crate::automation::{AutomationError, TaskEvent};
use crate::credentials::{ProviderStatus, RemoveOutcome};
use crate::menu::{LinePrompt, confirmed};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::mpsc;

/// Browser automation driven by LLM agents
#[derive(Parser, Debug)]
#[command(name = "browsework", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file (default: <config dir>/browsework/config.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a single browser task (non-interactive)
    Run(RunArgs),
    /// Inspect or change provider API keys
    Keys(KeysArgs),
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// The task to execute (use "-" to read from stdin)
    #[arg(required = true)]
    pub task: String,

    /// Model id from `keys status`
    #[arg(short, long, default_value = "1")]
    pub model: String,
}

#[derive(Parser, Debug)]
pub struct KeysArgs {
    #[command(subcommand)]
    pub action: KeysAction,
}

#[derive(Subcommand, Debug)]
pub enum KeysAction {
    /// Verify every stored key and show the result
    Status,
    /// Set a key; it is kept only if it verifies
    Set {
        /// Model id
        id: String,
        /// New key (prompted if omitted)
        key: Option<String>,
    },
    /// Clear a key
    Remove {
        /// Model id
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Run a task and print its events to `out` as they arrive.
pub async fn execute_task<W: Write + Send>(
    app: &App,
    task: &str,
    model_id: &str,
    out: &mut W,
) -> Result<(), AutomationError> {
    let (tx, mut rx) = mpsc::channel::<TaskEvent>(64);

    let run = async move {
        let result = app.session.run_task(task, model_id, &tx).await;
        drop(tx);
        result
    };

    let print = async {
        while let Some(event) = rx.recv().await {
            let _ = match event {
                TaskEvent::Message(message) => writeln!(out, "{message}"),
                TaskEvent::Artifact(path) => writeln!(out, "Result artifact: {}", path.display()),
            };
            let _ = out.flush();
        }
    };

    let (result, ()) = tokio::join!(run, print);
    result
}

/// Render status rows, one provider per line.
pub fn write_statuses<W: Write>(out: &mut W, statuses: &[ProviderStatus]) -> io::Result<()> {
    for status in statuses {
        let mark = if status.usable { "usable" } else { "not usable" };
        writeln!(
            out,
            "{}. {} ({}, {}): {} [{mark}]",
            status.config.id,
            status.config.name,
            status.config.provider.name(),
            status.config.model,
            status.masked_key,
        )?;
        if let Some(message) = &status.message {
            writeln!(out, "   {message}")?;
        }
    }
    Ok(())
}

/// Run the one-shot task command
pub async fn run(app: &App, args: RunArgs) -> ExitCode {
    match run_inner(app, args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

async fn run_inner(app: &App, args: RunArgs) -> Result<ExitCode> {
    let task = if args.task == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer.trim().to_string()
    } else {
        args.task
    };

    if task.is_empty() {
        anyhow::bail!("Empty task");
    }

    let config = crate::credentials::CredentialManager::config(&args.model)?;
    eprintln!("Using {} for task execution", config.name);

    let mut stdout = io::stdout();
    match execute_task(app, &task, &args.model, &mut stdout).await {
        Ok(()) => Ok(ExitCode::from(0)),
        Err(e) => {
            eprintln!("Error executing task: {e}");
            Ok(ExitCode::from(1))
        }
    }
}

/// Run a key management command
pub async fn keys(app: &App, args: KeysArgs) -> ExitCode {
    match keys_inner(app, args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

async fn keys_inner(app: &App, args: KeysArgs) -> Result<ExitCode> {
    let credentials = &app.credentials;
    let mut prompt = LinePrompt::stdin();

    match args.action {
        KeysAction::Status => {
            eprintln!("Verifying API keys...");
            let statuses = credentials.status_report().await;
            write_statuses(&mut io::stdout(), &statuses)?;
            Ok(ExitCode::from(0))
        }
        KeysAction::Set { id, key } => {
            let config = crate::credentials::CredentialManager::config(&id)?;
            let key = match key {
                Some(key) => key,
                None => {
                    let text = format!("Enter new API key for {}: ", config.name);
                    prompt.ask(&mut io::stdout(), &text).await?.unwrap_or_default()
                }
            };
            if key.trim().is_empty() {
                println!("No changes made to API key.");
                return Ok(ExitCode::from(0));
            }

            eprintln!("Testing API key for {}...", config.name);
            match credentials.update(&id, &key).await {
                Ok(message) => {
                    println!("{message}");
                    println!("API key for {} updated and verified successfully.", config.name);
                    Ok(ExitCode::from(0))
                }
                Err(e) => {
                    eprintln!("{e}");
                    Ok(ExitCode::from(1))
                }
            }
        }
        KeysAction::Remove { id, yes } => {
            let config = crate::credentials::CredentialManager::config(&id)?;
            if !credentials.has_key(&id)? {
                println!("No API key set for {}", config.name);
                return Ok(ExitCode::from(0));
            }

            let confirm = yes || {
                let text = format!(
                    "Are you sure you want to remove the API key for {}? (yes/no): ",
                    config.name
                );
                confirmed(prompt.ask(&mut io::stdout(), &text).await?.as_deref())
            };

            match credentials.remove(&id, confirm).await? {
                RemoveOutcome::Removed => println!("API key for {} removed successfully.", config.name),
                RemoveOutcome::Cancelled => println!("API key removal cancelled."),
            }
            Ok(ExitCode::from(0))
        }
    }
}
