//! CLI command implementations.

mod ask;
mod cache;
mod config;
mod enrich;
mod search;
mod transcribe;

pub use ask::{run_ask, run_example};
pub use cache::run_cache;
pub use config::run_config;
pub use enrich::run_enrich;
pub use search::run_search;
pub use transcribe::{run_transcribe, TranscribeArgs};
