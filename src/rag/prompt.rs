//! Prompt construction for answer generation.

use crate::config::Prompts;
use crate::error::Result;
use crate::search::RankedChunk;
use serde::Serialize;
use std::collections::HashMap;

/// The fields of a chunk the model gets to see.
#[derive(Serialize)]
struct PromptRecord<'a> {
    title: Option<&'a str>,
    number: Option<u32>,
    text: &'a str,
    start: f64,
    end: f64,
}

impl<'a> From<&'a RankedChunk> for PromptRecord<'a> {
    fn from(ranked: &'a RankedChunk) -> Self {
        Self {
            title: ranked.chunk.title.as_deref(),
            number: ranked.chunk.number,
            text: &ranked.chunk.text,
            start: ranked.chunk.start,
            end: ranked.chunk.end,
        }
    }
}

/// Renders a query and its ranked chunks into a single prompt.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    prompts: Prompts,
}

impl PromptBuilder {
    /// Create a builder using the given prompt set.
    pub fn new(prompts: Prompts) -> Self {
        Self { prompts }
    }

    /// Build the prompt for `query`.
    ///
    /// Output depends only on the inputs and the template, so the same query
    /// and results always give byte-identical text.
    pub fn build(&self, query: &str, results: &[RankedChunk]) -> Result<String> {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), format_context(results)?);
        vars.insert("question".to_string(), query.to_string());

        Ok(self.prompts.render_with_custom(&self.prompts.rag.template, &vars))
    }
}

/// Serialize chunks as a JSON array with one record per line, in rank order.
pub fn format_context(results: &[RankedChunk]) -> Result<String> {
    if results.is_empty() {
        return Ok("[]".to_string());
    }

    let records = results
        .iter()
        .map(|r| serde_json::to_string(&PromptRecord::from(r)))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(format!("[\n{}\n]", records.join(",\n")))
}
