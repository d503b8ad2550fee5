//! Shared plumbing for the OpenAI-compatible endpoints.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use copilot_contracts::{
    error::{CopilotError, CopilotResult},
    settings::GenerationSettings,
};

/// Longest slice of an error body quoted back in error messages.
const ERROR_BODY_CHARS: usize = 300;

/// Look up the API key named by `settings.api_key_env` through `lookup`.
///
/// Returns `CopilotError::Config` when the variable is unset or blank.
pub fn resolve_api_key<F>(settings: &GenerationSettings, lookup: F) -> CopilotResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(&settings.api_key_env)
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .ok_or_else(|| CopilotError::Config {
            reason: format!("environment variable {} is not set", settings.api_key_env),
        })
}

/// `{base_url}/{path}` without doubling the slash.
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// A bearer-authenticated JSON client for one base URL.
pub(crate) struct ApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ApiClient {
    /// Build a client; `to_error` picks the error variant for this caller.
    pub(crate) fn new(
        settings: &GenerationSettings,
        api_key: String,
        to_error: fn(String) -> CopilotError,
    ) -> CopilotResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| to_error(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            api_key,
        })
    }

    /// POST `body` to `path` and return the raw response text.
    ///
    /// Transport failures and non-success statuses go through `to_error`.
    pub(crate) fn post_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        to_error: fn(String) -> CopilotError,
    ) -> CopilotResult<String> {
        let url = endpoint(&self.base_url, path);
        debug!(url = %url, "POST");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .map_err(|e| to_error(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| to_error(format!("failed to read response from {url}: {e}")))?;
        if !status.is_success() {
            return Err(to_error(format!(
                "{url} returned HTTP {status}: {}",
                truncate(text.trim(), ERROR_BODY_CHARS)
            )));
        }
        Ok(text)
    }
}

/// Deserialize a response body, mapping failures through `to_error`.
pub(crate) fn decode<T: DeserializeOwned>(
    body: &str,
    to_error: fn(String) -> CopilotError,
) -> CopilotResult<T> {
    serde_json::from_str(body).map_err(|e| to_error(format!("unexpected response shape: {}", e)))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn endpoint_joins_cleanly() {
        assert_eq!(endpoint("https://api.openai.com/v1", "chat/completions"), "https://api.openai.com/v1/chat/completions");
        assert_eq!(endpoint("http://localhost:8080/v1/", "/embeddings"), "http://localhost:8080/v1/embeddings");
    }

    #[test]
    fn api_key_from_named_variable() {
        let env: HashMap<&str, &str> = [("MY_KEY", " sk-test ")].into_iter().collect();
        let settings = GenerationSettings { api_key_env: "MY_KEY".into(), ..GenerationSettings::default() };

        let key = resolve_api_key(&settings, |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(key, "sk-test");
    }

    #[test]
    fn missing_api_key_is_config_error() {
        let result = resolve_api_key(&GenerationSettings::default(), |_| None);
        match result {
            Err(CopilotError::Config { reason }) => assert!(reason.contains("OPENAI_API_KEY")),
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn blank_api_key_is_config_error() {
        let result = resolve_api_key(&GenerationSettings::default(), |_| Some("   ".into()));
        assert!(result.is_err());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("ééé", 2), "éé");
        assert_eq!(truncate("ab", 5), "ab");
    }
}
