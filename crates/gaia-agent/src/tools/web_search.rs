//! Web search tool
//!
//! Uses the Tavily API when `TAVILY_API_KEY` resolves, otherwise scrapes the
//! DuckDuckGo HTML endpoint (free, best-effort).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{AiError, Result};
use crate::http_client::build_http_client;
use crate::tools::traits::{SecretResolver, Tool, ToolOutput, env_secret_resolver};

const DEFAULT_RESULTS: usize = 5;
const MAX_RESULTS: usize = 10;
const TAVILY_URL: &str = "https://api.tavily.com/search";
const DUCKDUCKGO_URL: &str = "https://html.duckduckgo.com/html/";

#[derive(Debug, Deserialize)]
struct WebSearchInput {
    query: String,
    num_results: Option<usize>,
}

/// A single normalised search hit.
#[derive(Debug, Clone, PartialEq)]
struct SearchHit {
    title: String,
    url: String,
    snippet: String,
}

impl SearchHit {
    fn to_json(&self) -> Value {
        json!({ "title": self.title, "url": self.url, "snippet": self.snippet })
    }
}

pub struct WebSearchTool {
    client: Client,
    secret_resolver: SecretResolver,
    tavily_url: String,
    duckduckgo_url: String,
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

impl WebSearchTool {
    pub fn new() -> Self {
        Self {
            client: build_http_client(),
            secret_resolver: env_secret_resolver(),
            tavily_url: TAVILY_URL.to_string(),
            duckduckgo_url: DUCKDUCKGO_URL.to_string(),
        }
    }

    pub fn with_secret_resolver(mut self, resolver: SecretResolver) -> Self {
        self.secret_resolver = resolver;
        self
    }

    /// Point both providers at other endpoints (mock servers in tests).
    pub fn with_endpoints(mut self, tavily: impl Into<String>, duckduckgo: impl Into<String>) -> Self {
        self.tavily_url = tavily.into();
        self.duckduckgo_url = duckduckgo.into();
        self
    }

    async fn tavily_search(&self, query: &str, num: usize, api_key: &str) -> Result<Vec<SearchHit>> {
        let response = self
            .client
            .post(&self.tavily_url)
            .json(&json!({ "api_key": api_key, "query": query, "max_results": num }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Tool(format!("Tavily returned {status}: {body}")));
        }

        let data: Value = response.json().await?;
        let hits = data["results"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .take(num)
                    .map(|r| SearchHit {
                        title: r["title"].as_str().unwrap_or_default().to_string(),
                        url: r["url"].as_str().unwrap_or_default().to_string(),
                        snippet: r["content"].as_str().unwrap_or_default().to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(hits)
    }

    async fn duckduckgo_search(&self, query: &str, num: usize) -> Result<Vec<SearchHit>> {
        let url = format!("{}?q={}", self.duckduckgo_url, urlencoding::encode(query));
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(AiError::Tool(format!(
                "DuckDuckGo returned status {}",
                response.status()
            )));
        }

        let html = response.text().await?;
        Ok(parse_duckduckgo_html(&html, num))
    }
}

fn parse_duckduckgo_html(html: &str, max_results: usize) -> Vec<SearchHit> {
    use scraper::{Html, Selector};

    let document = Html::parse_document(html);
    let (Ok(result_sel), Ok(link_sel), Ok(snippet_sel)) = (
        Selector::parse(".result"),
        Selector::parse(".result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    document
        .select(&result_sel)
        .filter_map(|element| {
            let link = element.select(&link_sel).next()?;
            let title = link.text().collect::<String>().trim().to_string();
            let url = unwrap_redirect(link.value().attr("href").unwrap_or_default());
            let snippet = element
                .select(&snippet_sel)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
                .unwrap_or_default();
            (!title.is_empty() && !url.is_empty()).then_some(SearchHit {
                title,
                url,
                snippet,
            })
        })
        .take(max_results)
        .collect()
}

/// DuckDuckGo wraps targets as `/l/?uddg=<encoded>`; return the target.
fn unwrap_redirect(raw: &str) -> String {
    let absolute = if raw.starts_with("//") {
        format!("https:{raw}")
    } else {
        raw.to_string()
    };
    let Ok(parsed) = url::Url::parse(&absolute) else {
        return raw.to_string();
    };
    if parsed.path().starts_with("/l/")
        && let Some((_, target)) = parsed.query_pairs().find(|(key, _)| key == "uddg")
    {
        return target.into_owned();
    }
    absolute
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web. Returns titles, URLs and snippets. Follow up with \
         extract_text_from_url to read a promising page in full."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query; include every specific detail from the question"
                },
                "num_results": {
                    "type": "integer",
                    "description": "Number of results to return (default: 5, max: 10)",
                    "default": DEFAULT_RESULTS
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput> {
        let params: WebSearchInput = serde_json::from_value(input)?;
        let num = params.num_results.unwrap_or(DEFAULT_RESULTS).clamp(1, MAX_RESULTS);

        if let Some(key) = (self.secret_resolver)("TAVILY_API_KEY") {
            match self.tavily_search(&params.query, num, &key).await {
                Ok(hits) => return Ok(search_output("tavily", &params.query, &hits)),
                Err(e) => tracing::warn!(error = %e, "Tavily search failed, falling back"),
            }
        }

        match self.duckduckgo_search(&params.query, num).await {
            Ok(hits) => Ok(search_output("duckduckgo", &params.query, &hits)),
            Err(e) => Ok(ToolOutput::error(format!("Web search failed: {e}"))),
        }
    }
}

fn search_output(provider: &str, query: &str, hits: &[SearchHit]) -> ToolOutput {
    ToolOutput::success(json!({
        "provider": provider,
        "query": query,
        "results": hits.iter().map(SearchHit::to_json).collect::<Vec<_>>(),
    }))
}
