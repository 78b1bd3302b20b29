//! RAG (Retrieval-Augmented Generation) for question answering with sources.
//!
//! Turns a question into ranked transcript chunks, renders them into a
//! prompt and asks the generator for an answer.

mod pipeline;
pub mod prompt;

pub use pipeline::{Answer, QueryPipeline};
pub use prompt::PromptBuilder;
