//! Klipp CLI entry point.

use anyhow::Result;
use clap::Parser;
use klipp::cli::commands::{self, TranscribeArgs};
use klipp::cli::{log_level, Cli, Commands};
use klipp::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(Settings::default_config_path);
    let settings = Settings::load_from(Some(&config_path))?;

    // Initialize logging
    let level = log_level(cli.verbose, &settings.general.log_level);

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("klipp={}", level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match &cli.command {
        None => {
            commands::run_example(&settings).await?;
        }

        Some(Commands::Ask { query, top_k }) => {
            commands::run_ask(query, *top_k, &settings).await?;
        }

        Some(Commands::Search { query, top_k }) => {
            commands::run_search(query, *top_k, &settings).await?;
        }

        Some(Commands::Transcribe {
            audio,
            language,
            task,
            title,
            number,
            output,
            append,
        }) => {
            let args = TranscribeArgs {
                audio,
                language: language.as_deref(),
                task: task.as_deref(),
                title: title.as_deref(),
                number: *number,
                output: output.as_deref(),
                append: *append,
            };
            commands::run_transcribe(args, &settings).await?;
        }

        Some(Commands::Enrich) => {
            commands::run_enrich(&settings).await?;
        }

        Some(Commands::Cache { action }) => {
            commands::run_cache(action, &settings)?;
        }

        Some(Commands::Config { action }) => {
            commands::run_config(action, &settings, &config_path)?;
        }
    }

    Ok(())
}
