use browsework::app::App;
use browsework::cli::{Cli, Commands};
use browsework::config::Config;
use browsework::menu::Menu;
use clap::Parser;
use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(config.log_path(), cli.verbose);

    let app = match App::new(config) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!("Startup failed: {e}");
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("Starting browser automation");

    let work = async {
        match cli.command {
            Some(Commands::Run(args)) => browsework::cli::run(&app, args).await,
            Some(Commands::Keys(args)) => browsework::cli::keys(&app, args).await,
            None => {
                let mut menu = Menu::new(&app, BufReader::new(tokio::io::stdin()), std::io::stdout());
                match menu.run().await {
                    Ok(()) => ExitCode::SUCCESS,
                    Err(e) => {
                        eprintln!("Error: {e}");
                        ExitCode::FAILURE
                    }
                }
            }
        }
    };

    // Dropping `work` abandons a running task and kills the agent process.
    // A key update in flight keeps running; shutdown waits for it.
    let code = tokio::select! {
        code = work => code,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\n\nProgram interrupted by user");
            tracing::warn!("Interrupted");
            ExitCode::from(3)
        }
    };

    app.shutdown().await;
    tracing::info!("Program terminated");
    code
}

/// Stderr layer filtered by `RUST_LOG`, plus a plain-text file layer.
fn init_logging(log_file: Option<&Path>, verbose: bool) {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let default_filter = if verbose { "browsework=debug" } else { "browsework=info" };
    let stderr_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(stderr_filter);

    let file_layer = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_filter(EnvFilter::new("browsework=debug")),
            ),
            Err(err) => {
                eprintln!("Failed to open log file {}: {err}", path.display());
                None
            }
        }
    });

    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
}
