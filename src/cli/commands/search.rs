//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::QueryPipeline;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, top_k: Option<usize>, settings: &Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Query, settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let top_k = top_k.unwrap_or(settings.query.top_k);
    let pipeline = QueryPipeline::from_settings(settings)?;

    let spinner = Output::spinner("Searching...");
    let results = pipeline.retrieve(query, top_k).await;
    spinner.finish_and_clear();

    match results {
        Ok(results) => {
            if results.is_empty() {
                Output::warning("The corpus is empty.");
            } else {
                Output::success(&format!("Found {} results", results.len()));

                for result in &results {
                    Output::search_result(
                        result.chunk.display_title(),
                        &result.format_timestamp(),
                        result.score,
                        &result.chunk.text,
                    );
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
