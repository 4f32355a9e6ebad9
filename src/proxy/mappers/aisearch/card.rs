// Card payload -> Markdown
// Cards are buffered by the translator and appended once the stream ends

use once_cell::sync::Lazy;
use regex::Regex;

use super::models::{CardContent, SearchResult, value_to_plain};
use crate::error::{ProxyError, ProxyResult};

const SEARCH_KEYWORDS_TAG: &str = "2001";
const SEARCH_RESULTS_TAG: &str = "2002";

/// Prompt section headers and role labels echoed back by the upstream search
/// planner. Only the first occurrence in each keyword is removed.
static KEYWORD_NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\[(Question|System Prompt|Chat History)\]\n|(user|assistant):)")
        .expect("static keyword pattern")
});

/// Parse a raw `card` content string and render it.
pub fn render_card(raw: &str) -> ProxyResult<String> {
    let card: CardContent =
        serde_json::from_str(raw).map_err(|e| ProxyError::UpstreamParse(e.to_string()))?;
    format_card(&card)
}

pub fn format_card(card: &CardContent) -> ProxyResult<String> {
    let items = &card.card_info.card_items;
    let mut markdown = String::from("\n\n---\n\n");

    if let Some(item) = items.iter().find(|i| i.tag() == SEARCH_KEYWORDS_TAG) {
        let raw_keywords: Vec<String> = serde_json::from_str(&item.content)
            .map_err(|e| ProxyError::UpstreamParse(e.to_string()))?;
        let keywords = clean_keywords(&raw_keywords);
        if !keywords.is_empty() {
            markdown.push_str(&format!("Search keywords: {}。", keywords.join("; ")));
        }
    }

    if let Some(item) = items.iter().find(|i| i.tag() == SEARCH_RESULTS_TAG) {
        let results: Vec<SearchResult> = serde_json::from_str(&item.content)
            .map_err(|e| ProxyError::UpstreamParse(e.to_string()))?;
        markdown.push_str(&format!("Found {} search results:\n", results.len()));
        for r in &results {
            markdown.push_str(&format!(
                "[{}] [{}]({})  Source: {}\n",
                value_to_plain(&r.id_index),
                value_to_plain(&r.name),
                value_to_plain(&r.url),
                value_to_plain(&r.site_name)
            ));
        }
    }

    Ok(markdown)
}

fn clean_keywords(raw: &[String]) -> Vec<String> {
    raw.iter()
        .map(|k| KEYWORD_NOISE.replace(k, "").into_owned())
        .filter(|k| !k.trim().is_empty())
        .collect()
}
