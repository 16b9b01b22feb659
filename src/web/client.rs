use crate::config::ExecutionConfig;
use htmd::HtmlToMarkdown;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum WebError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Request to {url} failed with status {status}")]
    Status { url: String, status: u16 },
    #[error("Request to {url} timed out")]
    Timeout { url: String },
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to process page content: {0}")]
    Content(String),
}

impl WebError {
    fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            WebError::Timeout {
                url: url.to_string(),
            }
        } else {
            WebError::Request {
                url: url.to_string(),
                source,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WebPage {
    pub url: String,
    pub title: String,
    /// Markdown rendering of the main content, possibly truncated
    pub content: String,
    /// Length in characters before truncation
    pub length: usize,
    pub truncated: bool,
}

pub struct WebClient {
    http_client: Client,
    search_endpoint: String,
    max_search_results: usize,
    max_content_chars: usize,
}

fn selector(css: &str) -> Result<Selector, WebError> {
    Selector::parse(css).map_err(|e| WebError::Content(format!("bad selector '{css}': {e}")))
}

struct Cleanup {
    images: Regex,
    empty_headings: Regex,
    empty_brackets: Regex,
    blank_runs: Regex,
}

fn cleanup_patterns() -> &'static Cleanup {
    static PATTERNS: OnceLock<Cleanup> = OnceLock::new();
    PATTERNS.get_or_init(|| Cleanup {
        images: Regex::new(r"!\[.*?\]\([^)]*\)\n?").expect("valid regex"),
        empty_headings: Regex::new(r"\n*#+ *\n+").expect("valid regex"),
        empty_brackets: Regex::new(r"\[\]").expect("valid regex"),
        blank_runs: Regex::new(r"\n{3,}").expect("valid regex"),
    })
}

impl WebClient {
    pub fn new(config: &ExecutionConfig) -> Result<Self, WebError> {
        let http_client = Client::builder()
            .timeout(config.http_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| WebError::from_reqwest("<client>", e))?;

        Ok(Self {
            http_client,
            search_endpoint: config.search_endpoint.clone(),
            max_search_results: config.max_search_results,
            max_content_chars: config.max_url_content_chars,
        })
    }

    /// Query the DuckDuckGo HTML endpoint. Returns the top results and the
    /// total number found on the page.
    pub async fn search(&self, query: &str) -> Result<(Vec<WebSearchResult>, usize), WebError> {
        if query.trim().is_empty() {
            return Err(WebError::Content("Search query must not be empty".to_string()));
        }

        let search_url = format!(
            "{}?q={}",
            self.search_endpoint,
            utf8_percent_encode(query, NON_ALPHANUMERIC)
        );
        debug!("Searching web: {}", search_url);

        let html = self.get_text(&search_url).await?;
        let results = parse_search_results(&html)?;
        let total = results.len();

        Ok((
            results.into_iter().take(self.max_search_results).collect(),
            total,
        ))
    }

    /// Fetch a page and convert its main content to markdown.
    pub async fn fetch(&self, url: &str) -> Result<WebPage, WebError> {
        let parsed = Url::parse(url).map_err(|e| WebError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(WebError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        debug!("Fetching URL: {}", parsed);
        let html = self.get_text(parsed.as_str()).await?;
        let (title, content) = extract_page(&html)?;

        let length = content.chars().count();
        let truncated = length > self.max_content_chars;
        let content = if truncated {
            content.chars().take(self.max_content_chars).collect()
        } else {
            content
        };

        Ok(WebPage {
            url: parsed.to_string(),
            title,
            content,
            length,
            truncated,
        })
    }

    async fn get_text(&self, url: &str) -> Result<String, WebError> {
        let resp = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| WebError::from_reqwest(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(WebError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        resp.text().await.map_err(|e| WebError::from_reqwest(url, e))
    }
}

fn parse_search_results(html: &str) -> Result<Vec<WebSearchResult>, WebError> {
    let document = Html::parse_document(html);
    let result_selector = selector(".result")?;
    let link_selector = selector(".result__a")?;
    let snippet_selector = selector(".result__snippet")?;

    let mut results = Vec::new();
    for result in document.select(&result_selector) {
        let Some(link) = result.select(&link_selector).next() else {
            continue;
        };
        let Some(snippet) = result.select(&snippet_selector).next() else {
            continue;
        };

        let href = link.value().attr("href").unwrap_or_default();
        results.push(WebSearchResult {
            title: link.text().collect::<String>().trim().to_string(),
            url: resolve_result_url(href),
            snippet: snippet.text().collect::<String>().trim().to_string(),
        });
    }

    Ok(results)
}

/// DuckDuckGo wraps targets as `//duckduckgo.com/l/?uddg=<encoded>`; unwrap
/// those and pass anything else through.
fn resolve_result_url(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    Url::parse(&absolute)
        .ok()
        .and_then(|redirect| {
            redirect
                .query_pairs()
                .find(|(key, _)| key == "uddg")
                .map(|(_, value)| value.into_owned())
        })
        .unwrap_or(absolute)
}

fn extract_page(html: &str) -> Result<(String, String), WebError> {
    let document = Html::parse_document(html);

    let title = document
        .select(&selector("title")?)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    // Prefer the main content area, then the body, then the whole document
    let main_html = document
        .select(&selector("main, article")?)
        .next()
        .or_else(|| {
            selector("body")
                .ok()
                .and_then(|body| document.select(&body).next())
        })
        .map(|element| element.inner_html())
        .unwrap_or_else(|| html.to_string());

    let converter = HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "noscript", "svg"])
        .build();
    let markdown = converter
        .convert(&main_html)
        .map_err(|e| WebError::Content(e.to_string()))?;

    let patterns = cleanup_patterns();
    let mut content = patterns.images.replace_all(&markdown, "").to_string();
    content = patterns.empty_headings.replace_all(&content, "\n").to_string();
    content = patterns.empty_brackets.replace_all(&content, "").to_string();
    content = patterns.blank_runs.replace_all(&content, "\n\n").to_string();

    Ok((title, content.trim().to_string()))
}
