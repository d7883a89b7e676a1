//! Website search tool.
//!
//! Fetches a web page, reduces it to plain text, splits the text into
//! passages and returns the passages that best match the search query.
//! Agents use it to ground market research in real pages (forums, app
//! store listings, competitor sites).

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::base_tool::{BaseTool, ToolError};

/// Name the model refers to in `Action:` lines.
pub const WEBSITE_SEARCH_TOOL_NAME: &str = "Search in a specific website";

const DEFAULT_DESCRIPTION: &str =
    "A tool that can be used to semantic search a query from a specific URL content.";
const DEFAULT_MAX_RESULTS: usize = 3;
const DEFAULT_PASSAGE_CHARS: usize = 600;
const MAX_PAGE_BYTES: usize = 2 * 1024 * 1024;

static SCRIPT_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(script|style|noscript)\b.*?</(script|style|noscript)>").unwrap());
static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static BLOCK_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</?(p|div|br|li|h[1-6]|tr|section|article)\b[^>]*>").unwrap());
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").unwrap());
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\r\f\v]+").unwrap());
static NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\n\s*").unwrap());
static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+|\n+").unwrap());
static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9]+").unwrap());

/// Arguments accepted in the model's `Action Input`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebsiteSearchArgs {
    #[serde(alias = "query")]
    pub search_query: String,
    #[serde(default, alias = "url")]
    pub website: Option<String>,
}

/// Search a query within the content of a website.
#[derive(Debug, Clone)]
pub struct WebsiteSearchTool {
    description: String,
    /// Fixed website; when set, the model only supplies the query.
    pub website: Option<String>,
    pub max_results: usize,
    pub passage_chars: usize,
    /// Bytes read from a page before the rest is ignored.
    pub max_page_bytes: usize,
    pub timeout: Duration,
    client: reqwest::Client,
}

impl Default for WebsiteSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

impl WebsiteSearchTool {
    pub fn new() -> Self {
        Self {
            description: DEFAULT_DESCRIPTION.to_string(),
            website: None,
            max_results: DEFAULT_MAX_RESULTS,
            passage_chars: DEFAULT_PASSAGE_CHARS,
            max_page_bytes: MAX_PAGE_BYTES,
            timeout: Duration::from_secs(20),
            client: reqwest::Client::new(),
        }
    }

    /// Replace the description shown to the model.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Restrict searches to one website.
    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }

    /// Interpret the raw `Action Input` text.
    ///
    /// Accepts a JSON object (`search_query`/`query` plus `website`/`url`),
    /// or a bare query when the tool has a fixed website.
    pub fn parse_args(&self, input: &str) -> Result<WebsiteSearchArgs, ToolError> {
        let trimmed = input.trim();
        let mut args = if trimmed.starts_with('{') {
            serde_json::from_str::<WebsiteSearchArgs>(trimmed)
                .map_err(|e| ToolError::InvalidInput(e.to_string()))?
        } else {
            WebsiteSearchArgs {
                search_query: trimmed.trim_matches('"').to_string(),
                website: None,
            }
        };

        if args.search_query.trim().is_empty() {
            return Err(ToolError::InvalidInput(
                "search_query must not be empty".to_string(),
            ));
        }
        if args.website.as_deref().map_or(true, |w| w.trim().is_empty()) {
            args.website = self.website.clone();
        }
        if args.website.is_none() {
            return Err(ToolError::InvalidInput(
                "no website given; pass {\"search_query\": \"...\", \"website\": \"https://...\"}"
                    .to_string(),
            ));
        }
        Ok(args)
    }

    async fn fetch_text(&self, website: &str) -> Result<String, ToolError> {
        let url = normalize_url(website);
        log::debug!("WebsiteSearchTool fetching {}", url);

        let mut response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .header("User-Agent", "startup-ideas/1.0 (+website-search)")
            .send()
            .await?
            .error_for_status()?;

        if let Some(content_type) = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !is_textual(content_type) {
                return Err(ToolError::Execution(format!(
                    "{} returned unsupported content type '{}'",
                    url, content_type
                )));
            }
        }

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let room = self.max_page_bytes - body.len();
            body.extend_from_slice(&chunk[..chunk.len().min(room)]);
            if body.len() >= self.max_page_bytes {
                log::debug!("WebsiteSearchTool truncated {} at {} bytes", url, body.len());
                break;
            }
        }
        Ok(html_to_text(&String::from_utf8_lossy(&body)))
    }
}

#[async_trait]
impl BaseTool for WebsiteSearchTool {
    fn name(&self) -> &str {
        WEBSITE_SEARCH_TOOL_NAME
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn args_schema(&self) -> Value {
        serde_json::json!({
            "search_query": {"type": "string", "description": "Mandatory search query you want to use to search a specific website"},
            "website": {"type": "string", "description": "Mandatory valid website URL you want to search on"},
        })
    }

    async fn run(&self, input: &str) -> Result<String, ToolError> {
        let args = self.parse_args(input)?;
        let website = args.website.unwrap_or_default();

        let text = self.fetch_text(&website).await?;
        if text.is_empty() {
            return Err(ToolError::NoResults(format!("{} has no readable text", website)));
        }

        let passages = split_passages(&text, self.passage_chars);
        let best = rank_passages(&args.search_query, &passages, self.max_results);
        if best.is_empty() {
            return Err(ToolError::NoResults(format!(
                "nothing on {} matches '{}'",
                website, args.search_query
            )));
        }

        Ok(format!(
            "Relevant content from {}:\n\n{}",
            website,
            best.join("\n\n")
        ))
    }
}

fn is_textual(content_type: &str) -> bool {
    let mime = content_type.split(';').next().unwrap_or("").trim().to_lowercase();
    mime.starts_with("text/")
        || mime.ends_with("+xml")
        || mime.ends_with("/xml")
        || mime == "application/json"
}

/// Add a scheme when the model omitted one.
fn normalize_url(website: &str) -> String {
    let website = website.trim();
    if website.starts_with("http://") || website.starts_with("https://") {
        website.to_string()
    } else {
        format!("https://{}", website)
    }
}

/// Reduce an HTML document to readable text, one block per line.
pub fn html_to_text(html: &str) -> String {
    let text = SCRIPT_STYLE.replace_all(html, " ");
    let text = COMMENT.replace_all(&text, " ");
    let text = BLOCK_TAG.replace_all(&text, "\n");
    let text = TAG.replace_all(&text, " ");
    let text = decode_entities(&text);
    let text = SPACES.replace_all(&text, " ");
    NEWLINES.replace_all(&text, "\n").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Group sentences into passages of roughly `max_chars` characters.
pub fn split_passages(text: &str, max_chars: usize) -> Vec<String> {
    let mut passages = Vec::new();
    let mut current = String::new();
    let mut last = 0;

    let push_sentence = |sentence: &str, current: &mut String, passages: &mut Vec<String>| {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            return;
        }
        if !current.is_empty() && current.len() + sentence.len() + 1 > max_chars {
            passages.push(std::mem::take(current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(sentence);
    };

    for m in SENTENCE_END.find_iter(text) {
        push_sentence(&text[last..m.start() + 1], &mut current, &mut passages);
        last = m.end();
    }
    push_sentence(&text[last..], &mut current, &mut passages);

    if !current.is_empty() {
        passages.push(current);
    }
    passages
}

/// Return up to `limit` passages ordered by query-term overlap.
///
/// A passage scores ten points per distinct query term it contains plus one
/// per occurrence; passages with no matching term are dropped. Ties keep
/// document order.
pub fn rank_passages(query: &str, passages: &[String], limit: usize) -> Vec<String> {
    let query_lower = query.to_lowercase();
    let terms: Vec<&str> = WORD
        .find_iter(&query_lower)
        .map(|m| m.as_str())
        .filter(|term| term.len() > 2)
        .collect();
    if terms.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, usize)> = passages
        .iter()
        .enumerate()
        .filter_map(|(index, passage)| {
            let lower = passage.to_lowercase();
            let words: Vec<&str> = WORD.find_iter(&lower).map(|m| m.as_str()).collect();
            let mut score = 0;
            for term in &terms {
                let hits = words.iter().filter(|w| *w == term).count();
                if hits > 0 {
                    score += 10 + hits;
                }
            }
            (score > 0).then_some((index, score))
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    scored
        .into_iter()
        .take(limit)
        .map(|(index, _)| passages[index].clone())
        .collect()
}
