//! `DuckDuckGoTools`: the production `WebTools`.

use std::time::Duration;

use rand::Rng;
use reqwest::blocking::Client;
use tracing::{debug, warn};
use url::Url;

use copilot_contracts::{
    error::{CopilotError, CopilotResult},
    settings::WebSettings,
    state::WebHit,
};
use copilot_core::traits::WebTools;

use crate::html::{clean_page_text, parse_search_results};

/// DuckDuckGo's script-free results endpoint.
pub const SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

fn web_error(reason: String) -> CopilotError {
    CopilotError::Web { reason }
}

/// Longest single sleep between attempts.
pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Sleep before retry number `attempt + 1`: `base * 2^attempt` plus uniform
/// jitter in `[0, base)`, never longer than [`MAX_BACKOFF`].
pub fn backoff_delay(attempt: u32, base_secs: f64, rng: &mut impl Rng) -> Duration {
    if base_secs.is_nan() || base_secs <= 0.0 {
        return Duration::ZERO;
    }
    let exponential = base_secs * 2f64.powi(attempt.min(16) as i32);
    let jitter = if base_secs.is_finite() { rng.gen_range(0.0..base_secs) } else { 0.0 };
    Duration::try_from_secs_f64(exponential + jitter)
        .unwrap_or(MAX_BACKOFF)
        .min(MAX_BACKOFF)
}

/// Run `op` once plus up to `max_retries` more times, sleeping with
/// jittered exponential backoff between attempts. `None` when every attempt
/// failed.
pub fn with_retries<T>(
    what: &str,
    max_retries: u32,
    backoff_base_secs: f64,
    mut op: impl FnMut() -> CopilotResult<T>,
) -> Option<T> {
    let mut rng = rand::thread_rng();
    for attempt in 0..=max_retries {
        match op() {
            Ok(value) => return Some(value),
            Err(e) if attempt < max_retries => {
                let delay = backoff_delay(attempt, backoff_base_secs, &mut rng);
                debug!(what, attempt, error = %e, delay_ms = delay.as_millis() as u64, "retrying");
                std::thread::sleep(delay);
            }
            Err(e) => {
                warn!(what, attempts = attempt + 1, error = %e, "giving up");
            }
        }
    }
    None
}

/// Web search and page reading over plain HTTP. Never fails outward: when
/// every attempt fails, `search` returns no hits and `fetch` an empty string.
pub struct DuckDuckGoTools {
    client: Client,
    settings: WebSettings,
}

impl DuckDuckGoTools {
    pub fn new(settings: WebSettings) -> CopilotResult<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| web_error(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, settings })
    }

    fn get_text(&self, url: &str, timeout: Duration) -> CopilotResult<String> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .map_err(|e| web_error(format!("request to {url} failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(web_error(format!("{url} returned HTTP {status}")));
        }
        response
            .text()
            .map_err(|e| web_error(format!("failed to read body of {url}: {e}")))
    }

    fn retry<T>(&self, what: &str, op: impl FnMut() -> CopilotResult<T>) -> Option<T> {
        with_retries(what, self.settings.max_retries, self.settings.backoff_base_secs, op)
    }
}

impl WebTools for DuckDuckGoTools {
    fn search(&self, query: &str, k: usize) -> Vec<WebHit> {
        let url = match Url::parse_with_params(SEARCH_ENDPOINT, &[("q", query)]) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "could not build search URL");
                return Vec::new();
            }
        };
        let timeout = Duration::from_secs(self.settings.search_timeout_secs);

        self.retry("web search", || {
            let html = self.get_text(url.as_str(), timeout)?;
            Ok(parse_search_results(&html, k))
        })
        .unwrap_or_default()
    }

    fn fetch(&self, url: &str) -> String {
        let timeout = Duration::from_secs(self.settings.read_timeout_secs);

        self.retry("page fetch", || {
            let html = self.get_text(url, timeout)?;
            Ok(clean_page_text(&html, self.settings.max_page_chars))
        })
        .unwrap_or_default()
    }
}
