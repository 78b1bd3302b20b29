//! Klipp - question answering over transcribed video
//!
//! A local-first CLI tool that answers questions by pointing at the videos
//! and timestamps where a topic is discussed.
//!
//! # Overview
//!
//! Klipp allows you to:
//! - Transcribe (and translate) audio into timestamped chunks
//! - Embed those chunks once with a local embedding model
//! - Search them semantically and ask a local LLM for pointers into the videos
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management and prompt templates
//! - `transcription` - Speech-to-text into timestamped segments
//! - `store` - Chunk store, enrichment and the embedding cache
//! - `embedding` - Embedding generation
//! - `generation` - Text generation
//! - `search` - Cosine similarity ranking
//! - `rag` - Prompt building and the query pipeline
//!
//! # Example
//!
//! ```rust,no_run
//! use klipp::config::Settings;
//! use klipp::rag::QueryPipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let pipeline = QueryPipeline::from_settings(&settings)?;
//!
//!     let answer = pipeline.process("Who is Lionel Messi?", 50).await?;
//!     println!("{}", answer);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod rag;
pub mod search;
pub mod store;
pub mod transcription;

#[cfg(test)]
mod test_support;

pub use error::{KlippError, Result};
