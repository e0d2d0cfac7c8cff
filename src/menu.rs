//! Interactive text menu.

use crate::app::App;
use crate::cli::{execute_task, write_statuses};
use crate::credentials::{CredentialManager, RemoveOutcome};
use crate::provider::ProviderConfig;
use anyhow::Result;
use std::io::{self, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

/// Reads answers line by line after writing a prompt.
pub struct LinePrompt<R> {
    lines: Lines<R>,
}

impl LinePrompt<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin> LinePrompt<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    /// Write `text`, then read one trimmed line. `None` at end of input.
    pub async fn ask<W: Write>(&mut self, out: &mut W, text: &str) -> io::Result<Option<String>> {
        write!(out, "{text}")?;
        out.flush()?;
        Ok(self.lines.next_line().await?.map(|line| line.trim().to_string()))
    }
}

/// Whether an answer confirms a yes/no question.
pub fn confirmed(answer: Option<&str>) -> bool {
    answer.is_some_and(|a| matches!(a.to_ascii_lowercase().as_str(), "y" | "yes"))
}

enum Flow {
    Continue,
    Exit,
}

/// Main menu over an input and an output stream.
pub struct Menu<'a, R, W> {
    app: &'a App,
    prompt: LinePrompt<R>,
    out: W,
}

impl<'a, R: AsyncBufRead + Unpin, W: Write + Send> Menu<'a, R, W> {
    pub fn new(app: &'a App, input: R, out: W) -> Self {
        Self {
            app,
            prompt: LinePrompt::new(input),
            out,
        }
    }

    async fn ask(&mut self, text: &str) -> io::Result<Option<String>> {
        self.prompt.ask(&mut self.out, text).await
    }

    /// Loop until the user exits or input ends.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            writeln!(self.out, "\n=== Browser Automation System ===")?;
            writeln!(self.out, "\nAvailable Actions:")?;
            writeln!(self.out, "1. Execute Browser Task")?;
            writeln!(self.out, "2. Manage API Keys")?;
            writeln!(self.out, "3. Exit")?;

            let Some(choice) = self.ask("\nSelect action (1-3): ").await? else {
                return Ok(());
            };

            let flow = match choice.as_str() {
                "1" => self.execute_tasks().await?,
                "2" => self.manage_keys().await?,
                "3" => {
                    writeln!(self.out, "\nExiting program...")?;
                    return Ok(());
                }
                _ => {
                    writeln!(self.out, "\nInvalid choice. Please select 1-3.")?;
                    Flow::Continue
                }
            };

            if let Flow::Exit = flow {
                return Ok(());
            }
        }
    }

    fn show_models(&mut self) -> io::Result<()> {
        writeln!(self.out, "\nAvailable AI Models:")?;
        writeln!(self.out, "----")?;
        for config in ProviderConfig::REGISTRY {
            let credentials = &self.app.credentials;
            let status = if credentials.is_usable(config.id) {
                "(key set)"
            } else {
                "(no valid key)"
            };
            writeln!(
                self.out,
                "{}. {} ({}) {status}",
                config.id,
                config.name,
                config.provider.name()
            )?;
        }
        Ok(())
    }

    async fn execute_tasks(&mut self) -> Result<Flow> {
        self.show_models()?;
        let Some(id) = self.ask("\nSelect AI model number (1-3): ").await? else {
            return Ok(Flow::Exit);
        };

        let Ok(config) = CredentialManager::config(&id) else {
            writeln!(self.out, "\nInvalid model selection. Please try again.")?;
            return Ok(Flow::Continue);
        };

        if !self.app.credentials.is_usable(&id) {
            writeln!(self.out, "\nInvalid or missing API key for {}", config.name)?;
            writeln!(self.out, "Please set up your API key first using option 2")?;
            return Ok(Flow::Continue);
        }

        writeln!(self.out, "\nUsing {} for task execution", config.name)?;

        loop {
            let Some(task) = self
                .ask("\nEnter your task (or type 'exit' to go back to the main menu): ")
                .await?
            else {
                return Ok(Flow::Exit);
            };

            if task.eq_ignore_ascii_case("exit") {
                writeln!(self.out, "\nReturning to the main menu...")?;
                return Ok(Flow::Continue);
            }
            if task.is_empty() {
                writeln!(self.out, "\nTask cannot be empty")?;
                continue;
            }

            writeln!(self.out, "\nExecuting task...")?;
            match execute_task(self.app, &task, &id, &mut self.out).await {
                Ok(()) => writeln!(self.out, "\nTask completed successfully")?,
                Err(e) => writeln!(self.out, "\nError executing task: {e}")?,
            }

            let Some(another) = self.ask("\nDo you want to perform another task? (y/n): ").await? else {
                return Ok(Flow::Exit);
            };
            match another.to_ascii_lowercase().as_str() {
                "y" | "yes" => {}
                "n" | "no" => {
                    writeln!(self.out, "\nReturning to the main menu...")?;
                    return Ok(Flow::Continue);
                }
                _ => {
                    writeln!(self.out, "\nInvalid input. Returning to the main menu...")?;
                    return Ok(Flow::Continue);
                }
            }
        }
    }

    async fn manage_keys(&mut self) -> Result<Flow> {
        loop {
            writeln!(self.out, "\n=== API Key Management ===")?;
            self.show_models()?;
            writeln!(self.out, "\nOptions:")?;
            writeln!(self.out, "1. Add/Update API Key")?;
            writeln!(self.out, "2. Remove API Key")?;
            writeln!(self.out, "3. List Key Status")?;
            writeln!(self.out, "4. Back to Main Menu")?;

            let Some(choice) = self.ask("\nSelect an option (1-4): ").await? else {
                return Ok(Flow::Exit);
            };

            match choice.as_str() {
                "1" => self.update_key().await?,
                "2" => self.remove_key().await?,
                "3" => {
                    writeln!(self.out, "\nVerifying API keys...")?;
                    let statuses = self.app.credentials.status_report().await;
                    write_statuses(&mut self.out, &statuses)?;
                }
                "4" => return Ok(Flow::Continue),
                _ => writeln!(self.out, "Invalid choice. Please select 1-4.")?,
            }
        }
    }

    async fn select_provider(&mut self, text: &str) -> Result<Option<&'static ProviderConfig>> {
        let Some(id) = self.ask(text).await? else {
            return Ok(None);
        };
        match CredentialManager::config(&id) {
            Ok(config) => Ok(Some(config)),
            Err(_) => {
                writeln!(self.out, "Invalid model selection")?;
                Ok(None)
            }
        }
    }

    async fn update_key(&mut self) -> Result<()> {
        let Some(config) = self
            .select_provider("\nSelect model number to add/update API key: ")
            .await?
        else {
            return Ok(());
        };

        let credentials = &self.app.credentials;
        writeln!(
            self.out,
            "\nCurrent API key for {}: {}",
            config.name,
            credentials.masked_key(config.id)?
        )?;

        let text = format!(
            "Enter new API key for {} (press Enter to keep current): ",
            config.name
        );
        let new_key = self.ask(&text).await?.unwrap_or_default();
        if new_key.is_empty() {
            writeln!(self.out, "No changes made to API key.")?;
            return Ok(());
        }

        writeln!(self.out, "\nTesting API key for {}...", config.name)?;
        match self.app.credentials.update(config.id, &new_key).await {
            Ok(message) => {
                writeln!(self.out, "{message}")?;
                writeln!(
                    self.out,
                    "API key for {} updated and verified successfully.",
                    config.name
                )?;
            }
            Err(e) => writeln!(self.out, "{e}")?,
        }
        Ok(())
    }

    async fn remove_key(&mut self) -> Result<()> {
        let Some(config) = self
            .select_provider("\nSelect model number to remove API key: ")
            .await?
        else {
            return Ok(());
        };

        if !self.app.credentials.has_key(config.id)? {
            writeln!(self.out, "No API key set for {}", config.name)?;
            return Ok(());
        }

        let text = format!(
            "Are you sure you want to remove the API key for {}? (yes/no): ",
            config.name
        );
        let answer = self.ask(&text).await?;

        match self
            .app
            .credentials
            .remove(config.id, confirmed(answer.as_deref()))
            .await
        {
            Ok(RemoveOutcome::Removed) => {
                writeln!(self.out, "\nAPI key for {} removed successfully.", config.name)?;
            }
            Ok(RemoveOutcome::Cancelled) => writeln!(self.out, "API key removal cancelled.")?,
            Err(e) => writeln!(self.out, "Error removing API key: {e}")?,
        }
        Ok(())
    }
}
