//! Web search tool
//!
//! Lets the model research the brand, product or audience before it writes
//! headlines and descriptions. Tavily is used when an API key is configured;
//! DuckDuckGo's instant answer API is the key-less fallback.
//!
//! Both providers are reduced to the same `SearchDigest`, returned to the
//! model as a JSON object like every other tool result. Snippets are cut to
//! ad-copy length so a search never floods the conversation.

use crate::errors::AgentError;
use crate::llm::ToolMetadata;
use crate::tools::Tool;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

const TOOL_NAME: &str = "web_search";
const TAVILY_BASE_URL: &str = "https://api.tavily.com";
const DUCKDUCKGO_BASE_URL: &str = "https://api.duckduckgo.com";

pub const DEFAULT_MAX_RESULTS: usize = 2;
pub const MAX_RESULTS_LIMIT: usize = 10;
/// Longest snippet handed back to the model, in characters.
pub const MAX_SNIPPET_CHARS: usize = 300;

#[derive(Debug, Clone, PartialEq)]
pub enum SearchEngine {
    DuckDuckGo,
    Tavily,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// What the model gets back from one search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchDigest {
    pub query: String,
    pub source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub results: Vec<SearchHit>,
}

impl SearchDigest {
    fn empty(query: &str, source: &'static str) -> Self {
        Self {
            query: query.to_string(),
            source,
            summary: None,
            results: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.results.is_empty()
    }
}

pub struct WebSearchTool {
    client: Client,
    api_key: Option<String>,
    search_engine: SearchEngine,
    base_url: String,
    max_results: usize,
}

fn http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|_| Client::new())
}

fn tool_error(message: String) -> AgentError {
    AgentError::ToolError {
        tool_name: TOOL_NAME.to_string(),
        message,
    }
}

/// Collapses whitespace and cuts at a word boundary.
fn snippet(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= MAX_SNIPPET_CHARS {
        return collapsed;
    }
    let cut: String = collapsed.chars().take(MAX_SNIPPET_CHARS).collect();
    let trimmed = match cut.rfind(' ') {
        Some(at) if at > MAX_SNIPPET_CHARS / 2 => &cut[..at],
        _ => cut.as_str(),
    };
    format!("{}...", trimmed.trim_end_matches(|c: char| c.is_ascii_punctuation()))
}

fn non_empty(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

/// Tavily `/search` response: an optional answer plus ranked results.
pub fn parse_tavily(query: &str, data: &Value, max_results: usize) -> SearchDigest {
    let mut digest = SearchDigest::empty(query, "tavily");
    digest.summary = non_empty(&data["answer"]).map(snippet);
    digest.results = data["results"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|result| {
            Some(SearchHit {
                title: non_empty(&result["title"])?.to_string(),
                url: non_empty(&result["url"])?.to_string(),
                snippet: snippet(non_empty(&result["content"]).unwrap_or_default()),
            })
        })
        .take(max_results)
        .collect();
    digest
}

/// DuckDuckGo instant answer response. Related topics may be grouped under
/// `Topics`; groups are flattened in order.
pub fn parse_duckduckgo(query: &str, data: &Value, max_results: usize) -> SearchDigest {
    let mut digest = SearchDigest::empty(query, "duckduckgo");
    digest.summary = non_empty(&data["Answer"])
        .or_else(|| non_empty(&data["AbstractText"]))
        .or_else(|| non_empty(&data["Abstract"]))
        .map(snippet);

    let mut hits = Vec::new();
    if let (Some(heading), Some(url)) = (non_empty(&data["Heading"]), non_empty(&data["AbstractURL"])) {
        hits.push(SearchHit {
            title: heading.to_string(),
            url: url.to_string(),
            snippet: digest.summary.clone().unwrap_or_default(),
        });
    }

    let topics = data["RelatedTopics"].as_array().into_iter().flatten();
    for topic in topics.flat_map(|t| match t["Topics"].as_array() {
        Some(group) => group.iter().collect::<Vec<_>>(),
        None => vec![t],
    }) {
        if let (Some(text), Some(url)) = (non_empty(&topic["Text"]), non_empty(&topic["FirstURL"])) {
            // Topic text starts with its title, e.g. "Nike - American footwear company".
            let title = text.split(" - ").next().unwrap_or(text);
            hits.push(SearchHit {
                title: title.to_string(),
                url: url.to_string(),
                snippet: snippet(text),
            });
        }
    }

    hits.truncate(max_results);
    digest.results = hits;
    digest
}

impl WebSearchTool {
    pub fn new() -> Self {
        Self {
            client: http_client(),
            api_key: None,
            search_engine: SearchEngine::DuckDuckGo,
            base_url: DUCKDUCKGO_BASE_URL.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_tavily_api_key(api_key: String) -> Self {
        Self {
            client: http_client(),
            api_key: Some(api_key),
            search_engine: SearchEngine::Tavily,
            base_url: TAVILY_BASE_URL.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// Points the provider at another host, e.g. a proxy.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Result count used when the model does not ask for one.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.clamp(1, MAX_RESULTS_LIMIT);
        self
    }

    pub fn search_engine(&self) -> &SearchEngine {
        &self.search_engine
    }

    pub async fn search(&self, query: &str, max_results: usize) -> Result<SearchDigest, AgentError> {
        let max_results = max_results.clamp(1, MAX_RESULTS_LIMIT);
        log::info!(
            "Web search via {:?}: '{}' (max_results: {})",
            self.search_engine,
            query,
            max_results
        );

        let digest = match self.search_engine {
            SearchEngine::DuckDuckGo => {
                let data = self.fetch_duckduckgo(query).await?;
                parse_duckduckgo(query, &data, max_results)
            }
            SearchEngine::Tavily => {
                let data = self.fetch_tavily(query, max_results).await?;
                parse_tavily(query, &data, max_results)
            }
        };

        if digest.is_empty() {
            log::warn!("Web search for '{}' returned nothing", query);
        }
        Ok(digest)
    }

    async fn fetch_duckduckgo(&self, query: &str) -> Result<Value, AgentError> {
        let url = format!(
            "{}/?q={}&format=json&no_html=1&skip_disambig=1",
            self.base_url,
            urlencoding::encode(query)
        );
        let response = self
            .client
            .get(&url)
            .header("User-Agent", concat!("adpilot/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(|e| tool_error(format!("DuckDuckGo request failed: {}", e.without_url())))?;

        Self::read_json(response, "DuckDuckGo").await
    }

    async fn fetch_tavily(&self, query: &str, max_results: usize) -> Result<Value, AgentError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AgentError::ConfigError("Tavily API key not configured".to_string()))?;

        let payload = json!({
            "query": query,
            "topic": "general",
            "search_depth": "basic",
            "include_answer": true,
            "include_images": false,
            "include_raw_content": false,
            "max_results": max_results
        });

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| tool_error(format!("Tavily request failed: {}", e.without_url())))?;

        Self::read_json(response, "Tavily").await
    }

    /// A rejected key is a configuration problem; other HTTP failures belong
    /// to the tool.
    async fn read_json(response: reqwest::Response, provider: &str) -> Result<Value, AgentError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| {
                    non_empty(&v["detail"]["error"])
                        .or_else(|| non_empty(&v["error"]))
                        .map(str::to_string)
                })
                .unwrap_or(body);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::ConfigError(
                    format!("{} rejected the API key ({}): {}", provider, status, detail),
                ),
                _ => tool_error(format!("{} returned {}: {}", provider, status, detail)),
            });
        }

        response.json().await.map_err(|e| {
            AgentError::ParsingError(format!("Invalid {} response: {}", provider, e.without_url()))
        })
    }
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: TOOL_NAME.to_string(),
            description: "Research a brand, product, competitor or audience on the web before writing ad copy. Returns a short summary and the top results with snippets.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to look up, e.g. the brand and product name"
                    },
                    "max_results": {
                        "type": "integer",
                        "description": format!("Number of results to return (default: {})", self.max_results),
                        "minimum": 1,
                        "maximum": MAX_RESULTS_LIMIT
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<String, AgentError> {
        let query = arguments
            .get("query")
            .and_then(non_empty)
            .ok_or_else(|| tool_error("Missing or empty 'query' parameter".to_string()))?;

        let max_results = arguments
            .get("max_results")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(self.max_results);

        let digest = self.search(query, max_results).await?;
        serde_json::to_string(&digest)
            .map_err(|e| AgentError::InternalError(format!("cannot serialize search results: {}", e)))
    }
}
