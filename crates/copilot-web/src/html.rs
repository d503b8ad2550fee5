//! Pure HTML helpers: result-page parsing and page-text cleaning.
//!
//! Kept free of I/O so they can be tested against fixed documents.

use std::sync::LazyLock;

use scraper::{Html, Node, Selector};
use url::Url;

use copilot_contracts::state::WebHit;

static RESULT_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.result__a").expect("static selector must parse"));

/// Subtrees whose text never reaches the cleaned page.
const DROPPED_TAGS: [&str; 5] = ["script", "style", "nav", "footer", "header"];

/// Extract up to `k` hits from a DuckDuckGo HTML results page.
///
/// Anchors with an empty `href` or empty title are skipped. Snippets are
/// not extracted and are always empty.
pub fn parse_search_results(html: &str, k: usize) -> Vec<WebHit> {
    let doc = Html::parse_document(html);
    let mut hits = Vec::new();

    for anchor in doc.select(&RESULT_LINK) {
        if hits.len() >= k {
            break;
        }
        let href = anchor.value().attr("href").unwrap_or("").trim();
        let title = anchor.text().collect::<String>().trim().to_string();
        if href.is_empty() || title.is_empty() {
            continue;
        }
        hits.push(WebHit {
            title,
            url: resolve_result_url(href),
            snippet: String::new(),
        });
    }
    hits
}

/// Unwrap DuckDuckGo's `/l/?uddg=<target>` redirect links and give
/// protocol-relative links a scheme. Anything else passes through.
pub fn resolve_result_url(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    let Ok(parsed) = Url::parse(&absolute) else {
        return href.to_string();
    };
    let is_redirect = parsed
        .host_str()
        .is_some_and(|host| host.ends_with("duckduckgo.com"))
        && parsed.path().starts_with("/l/");
    if is_redirect {
        if let Some((_, target)) = parsed.query_pairs().find(|(key, _)| key == "uddg") {
            return target.into_owned();
        }
    }
    absolute
}

/// Visible text of `html` with chrome removed.
///
/// Drops `script`, `style`, `nav`, `footer` and `header` subtrees, collapses
/// runs of whitespace to single spaces, and truncates to `max_chars`
/// characters.
pub fn clean_page_text(html: &str, max_chars: usize) -> String {
    let doc = Html::parse_document(html);
    let mut pieces: Vec<&str> = Vec::new();

    for node in doc.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let inside_dropped = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| DROPPED_TAGS.contains(&el.name()))
        });
        if !inside_dropped {
            pieces.push(text);
        }
    }

    let collapsed = pieces
        .iter()
        .flat_map(|piece| piece.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ");
    collapsed.chars().take(max_chars).collect()
}
