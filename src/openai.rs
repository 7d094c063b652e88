//! OpenAI-compatible client construction.
//!
//! Every provider we talk to (Gemini's compatibility endpoint included) speaks
//! the OpenAI wire format, so one client type covers all of them. A client is
//! bound to a single credential; callers build one per pooled key.

use crate::error::Result;
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for model API requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Create a client for `api_base` authenticated with `api_key`.
pub fn create_client_with_timeout(
    api_base: &str,
    api_key: &str,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    let config = OpenAIConfig::new()
        .with_api_base(api_base.trim_end_matches('/'))
        .with_api_key(api_key);

    Ok(Client::with_config(config).with_http_client(http_client))
}
