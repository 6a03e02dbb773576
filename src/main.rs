//! Hotscribe - hold-to-record dictation pasted at your cursor
//!
//! Run with `hotscribe` or `hotscribe daemon` to start the daemon.
//! Use `hotscribe transcribe <file>` to transcribe an audio file.
//! Use `hotscribe settings` to edit runtime settings without a restart.

use clap::Parser;
use hotscribe::cli::{Cli, Commands, SettingsAction};
use hotscribe::config::{self, Config, RuntimeSettings};
use hotscribe::{audio, daemon, transcribe};
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("hotscribe={},warn", log_level))),
        )
        .with_target(false)
        .init();

    // Load configuration
    let mut config = config::load_config(cli.config.as_deref())?;

    // Apply CLI overrides
    if cli.clipboard {
        config.output.mode = config::OutputMode::Clipboard;
    }
    if let Some(model) = cli.model {
        config.transcription.model = model;
    }
    if let Some(language) = cli.language {
        config.transcription.language = language;
    }
    if let Some(hotkey) = cli.hotkey {
        config.hotkey.key = hotkey;
    }

    // Run the appropriate command
    match cli.command.unwrap_or(Commands::Daemon) {
        Commands::Daemon => {
            let mut daemon = daemon::Daemon::new(config);
            daemon.run().await?;
        }
        Commands::Transcribe { file } => {
            transcribe_file(&config, &file)?;
        }
        Commands::Config => {
            show_config(&config)?;
        }
        Commands::Settings { action } => {
            run_settings(&config, action)?;
        }
    }

    Ok(())
}

/// Transcribe an audio file and print the recognized text
fn transcribe_file(config: &Config, file: &Path) -> anyhow::Result<()> {
    let bytes = std::fs::read(file)?;

    match audio::encode::decode_wav(&bytes) {
        Ok((spec, samples)) => {
            let secs =
                samples.len() as f64 / f64::from(spec.sample_rate) / f64::from(spec.channels);
            tracing::info!(
                "Input: {} Hz, {} channel(s), {} bit, {:.2}s",
                spec.sample_rate,
                spec.channels,
                spec.bits_per_sample,
                secs
            );
        }
        Err(e) => {
            tracing::warn!("Input does not look like a WAV container: {}", e);
        }
    }

    let transcriber = transcribe::create_transcriber()?;
    let runtime = RuntimeSettings::resolve(config, &Config::runtime_store_path());
    let text = transcriber.transcribe(&bytes, &runtime.transcription)?;
    println!("{}", text);
    Ok(())
}

/// Print the effective configuration and relevant paths
fn show_config(config: &Config) -> anyhow::Result<()> {
    if let Some(path) = Config::default_path() {
        println!("# Config file: {}", path.display());
    }
    println!("# Runtime store: {}", Config::runtime_store_path().display());
    println!();
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Show or edit the hot-reloadable runtime store
fn run_settings(config: &Config, action: SettingsAction) -> anyhow::Result<()> {
    let store = Config::runtime_store_path();

    match action {
        SettingsAction::Show => {
            let settings = RuntimeSettings::resolve(config, &store);
            let language = if settings.transcription.language.is_empty() {
                "(auto-detect)"
            } else {
                settings.transcription.language.as_str()
            };
            println!("language:      {}", language);
            println!("model:         {}", settings.transcription.model);
            println!("add_timestamp: {}", settings.add_timestamp);
        }
        SettingsAction::Language { code } => {
            config::write_runtime_key(
                &store,
                "transcription",
                "language",
                serde_json::Value::String(code.clone()),
            )?;
            println!("Language set to: {} (applies to the next recording)", code);
        }
        SettingsAction::Model { name } => {
            config::write_runtime_key(
                &store,
                "transcription",
                "model",
                serde_json::Value::String(name.clone()),
            )?;
            println!("Model set to: {} (applies to the next recording)", name);
        }
        SettingsAction::Timestamp { enabled } => {
            config::write_runtime_key(
                &store,
                "paste",
                "add_timestamp",
                serde_json::Value::Bool(enabled),
            )?;
            let status = if enabled { "enabled" } else { "disabled" };
            println!("Timestamp prefix {} (applies to the next paste)", status);
        }
    }

    Ok(())
}
