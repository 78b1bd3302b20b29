//! Transcribe command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Settings, TranscriptionTask};
use crate::store::ChunkStore;
use crate::transcription::{transcribe_to_corpus, TranscribeOptions, WhisperTranscriber};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Options collected from the command line.
pub struct TranscribeArgs<'a> {
    pub audio: &'a str,
    pub language: Option<&'a str>,
    pub task: Option<&'a str>,
    pub title: Option<&'a str>,
    pub number: Option<u32>,
    pub output: Option<&'a str>,
    pub append: bool,
}

/// Run the transcribe command.
pub async fn run_transcribe(args: TranscribeArgs<'_>, settings: &Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Transcribe, settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let mut options = TranscribeOptions::from_settings(&settings.transcription);
    if let Some(language) = args.language {
        options.language = language.to_string();
    }
    if let Some(task) = args.task {
        options.task = task
            .parse::<TranscriptionTask>()
            .map_err(|e| anyhow::anyhow!(e))?;
    }

    let audio_path = Settings::expand_path(args.audio);
    let transcriber = WhisperTranscriber::from_settings(settings)?;

    Output::info(&format!(
        "Processing: {} ({}, {})",
        audio_path.display(),
        options.language,
        options.task
    ));

    let spinner = Output::spinner("Transcribing...");
    let result = transcribe_to_corpus(&transcriber, &audio_path, &options).await;
    spinner.finish_and_clear();

    let mut corpus = match result {
        Ok(corpus) => corpus,
        Err(e) => {
            Output::error(&format!("Failed to transcribe: {}", e));
            return Err(e.into());
        }
    };

    for chunk in &mut corpus {
        chunk.title = args.title.map(str::to_string);
        chunk.number = args.number;
    }
    let count = corpus.len();

    if let Some(output) = args.output {
        let path = PathBuf::from(output);
        ChunkStore::new(&path).save(&corpus)?;
        Output::success(&format!("Wrote {} chunks to {}", count, path.display()));
        return Ok(());
    }

    let store = ChunkStore::new(settings.chunks_path());
    if args.append {
        let total = store.append(corpus)?;
        Output::success(&format!(
            "Appended {} chunks to {} ({} total)",
            count,
            display(store.path()),
            total
        ));
    } else {
        if store.exists() {
            Output::warning(&format!("Replacing {}", display(store.path())));
        }
        store.save(&corpus)?;
        Output::success(&format!("Wrote {} chunks to {}", count, display(store.path())));
    }
    Output::info("Run 'klipp enrich' to embed the new chunks.");

    Ok(())
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
