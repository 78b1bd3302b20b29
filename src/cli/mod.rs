//! CLI module for Klipp.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Klipp - ask questions about transcribed videos
///
/// Transcribes audio into timestamped chunks, embeds them, and answers
/// questions by pointing at the videos and timestamps that cover them.
/// Without a command, runs the configured example query.
#[derive(Parser, Debug)]
#[command(name = "klipp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "KLIPP_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a question and get pointers into your video library
    Ask {
        /// The question to ask
        query: String,

        /// Number of chunks to give the model as context
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Search for the chunks most relevant to a query
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Transcribe an audio file into chunks
    Transcribe {
        /// Path to the audio file
        audio: String,

        /// Source language of the audio (ISO-639-1, e.g. "hi")
        #[arg(short, long)]
        language: Option<String>,

        /// translate (to English) or transcribe (keep source language)
        #[arg(long)]
        task: Option<String>,

        /// Video title to stamp on every chunk
        #[arg(long)]
        title: Option<String>,

        /// Video number to stamp on every chunk
        #[arg(long)]
        number: Option<u32>,

        /// Write the chunks to this file instead of the chunk store
        #[arg(short, long, conflicts_with = "append")]
        output: Option<String>,

        /// Append to the existing chunk store instead of replacing it
        #[arg(long)]
        append: bool,
    },

    /// Add ids and embeddings to every chunk in the chunk store
    Enrich,

    /// Manage the embedding cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Log level for the `klipp` target: the `-v` count wins, otherwise the
/// configured `general.log_level`.
pub fn log_level(verbose: u8, configured: &str) -> &str {
    match verbose {
        0 => configured,
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Rebuild the cache from the enriched chunk store
    Build,

    /// Delete the cache file
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
