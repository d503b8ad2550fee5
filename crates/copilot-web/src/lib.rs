//! # copilot-web
//!
//! Web fallback for questions the textbook cannot answer.
//!
//! [`DuckDuckGoTools`] implements
//! [`WebTools`](copilot_core::traits::WebTools) by scraping DuckDuckGo's HTML
//! results page and fetching result pages as cleaned plain text. Both calls
//! retry with jittered exponential backoff and degrade to empty results.

pub mod html;
pub mod tools;

pub use html::{clean_page_text, parse_search_results, resolve_result_url};
pub use tools::{backoff_delay, with_retries, DuckDuckGoTools, MAX_BACKOFF, SEARCH_ENDPOINT};
