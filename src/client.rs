//! HTTP client construction for the external services.

use crate::error::{KlippError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;
use url::Url;

/// Default timeout for service requests (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Build a plain HTTP client with the given timeout.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| KlippError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Resolve an API path against a service base URL.
///
/// The base is treated as a directory, so `http://host/ollama` and
/// `http://host/ollama/` both resolve `api/embed` to `http://host/ollama/api/embed`.
pub fn endpoint_url(base_url: &str, path: &str) -> Result<Url> {
    let mut base = Url::parse(base_url)
        .map_err(|e| KlippError::Config(format!("Invalid service URL '{}': {}", base_url, e)))?;

    if !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }

    base.join(path.trim_start_matches('/'))
        .map_err(|e| KlippError::Config(format!("Invalid endpoint path '{}': {}", path, e)))
}

/// Create an OpenAI client with a custom timeout.
///
/// The API key is read from `OPENAI_API_KEY`.
pub fn create_openai_client_with_timeout(timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = http_client(timeout)?;
    Ok(Client::with_config(OpenAIConfig::default()).with_http_client(http_client))
}

/// Check if the OpenAI API key is configured.
pub fn is_api_key_configured() -> bool {
    std::env::var("OPENAI_API_KEY").is_ok_and(|key| !key.is_empty())
}
