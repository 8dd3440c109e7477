use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use snaptext_config::{Config, ConfigLoader};

pub mod autostart;
pub mod cli;
pub mod console;
pub mod lifecycle;
pub mod logging;
pub mod pipeline;
pub mod state;

#[cfg(test)]
mod tests;

use self::cli::Cli;
use self::state::AppState;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_path = logging::init(&executable_dir().join(logging::LOG_DIR_NAME));
    tracing::info!("snaptext {} starting", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &log_path {
        tracing::info!("Logging to {}", path.display());
    }

    if let Some(command) = cli.autostart_command() {
        return autostart::run_command(command);
    }

    match run(&cli) {
        Ok(()) => {
            tracing::info!("snaptext stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Fatal: {:#}", e);
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn executable_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn run(cli: &Cli) -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!("Failed to load .env: {}", e);
        }
    }

    let loader = match &cli.config {
        Some(path) => ConfigLoader::new(path),
        None => ConfigLoader::beside_executable()?,
    };
    let config = loader
        .load()
        .with_context(|| format!("Invalid configuration in {}", loader.path().display()))?;

    print_banner(&config);

    if let Some(seconds) = cli.grace_delay() {
        lifecycle::run_grace_delay(seconds);
    }

    if !cli.no_hide {
        console::hide_console();
    }

    lifecycle::run(Arc::new(AppState::new(config)))
}

fn print_banner(config: &Config) {
    println!("snaptext is running");
    match &config.source {
        Some(path) => println!("Config: {}", path.display()),
        None => println!("Config: defaults (no readable config file)"),
    }
    println!("Hotkeys:");
    println!("  {:<12} capture a region and copy its text", config.hotkeys.capture);
    println!("  {:<12} quit", config.hotkeys.quit);
    println!("Autostart:");
    println!("  snaptext --enable-autostart");
    println!("  snaptext --disable-autostart");
    println!("  snaptext --check-autostart");
    if config.credential.is_none() {
        println!("No API key configured, captures will not be recognized.");
    }
}
