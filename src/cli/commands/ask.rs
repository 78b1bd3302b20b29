//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::QueryPipeline;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(query: &str, top_k: Option<usize>, settings: &Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Query, settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let top_k = top_k.unwrap_or(settings.query.top_k);
    let pipeline = QueryPipeline::from_settings(settings)?;

    let spinner = Output::spinner("Searching for relevant chunks...");
    let result = pipeline.answer(query, top_k).await;
    spinner.finish_and_clear();

    match result {
        Ok(answer) => {
            println!();
            Output::rule();
            println!("QUERY: {}", query);
            Output::rule();
            println!("{}", answer.response);
            Output::rule();

            if !answer.sources.is_empty() {
                Output::header("Top sources");
                for source in answer.sources.iter().take(5) {
                    Output::search_result(
                        source.chunk.display_title(),
                        &source.format_timestamp(),
                        source.score,
                        &source.chunk.text,
                    );
                }
            }
            Output::kv("Prompt", &pipeline.prompt_path().display().to_string());
        }
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}

/// Run the configured example query; used when no command is given.
pub async fn run_example(settings: &Settings) -> Result<()> {
    let query = settings.query.example_query.clone();
    run_ask(&query, None, settings).await
}
