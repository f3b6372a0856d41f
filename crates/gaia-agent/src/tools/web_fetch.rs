//! Page reader: fetches a URL and returns the readable text of the HTML.

use std::net::IpAddr;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Node, Selector};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::Result;
use crate::http_client::build_http_client;
use crate::text_utils::truncate_with_marker;
use crate::tools::traits::{Tool, ToolOutput};

const MAX_CONTENT_LENGTH: usize = 15_000;
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "nav", "footer", "header", "svg", "iframe", "form",
];
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "br", "tr", "td", "th", "pre",
    "blockquote", "section", "table",
];

#[derive(Debug, Deserialize)]
struct ExtractTextInput {
    url: String,
}

/// Reject non-http schemes and hosts on loopback/private networks.
fn validate_url(raw: &str) -> std::result::Result<url::Url, String> {
    let parsed = url::Url::parse(raw).map_err(|e| format!("Invalid URL: {e}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("Scheme '{}' is not allowed", parsed.scheme()));
    }

    let host = match parsed.host() {
        Some(url::Host::Domain(domain)) => {
            if domain.eq_ignore_ascii_case("localhost") {
                return Err("Access to localhost is not allowed".to_string());
            }
            return Ok(parsed.clone());
        }
        Some(url::Host::Ipv4(v4)) => IpAddr::V4(v4),
        Some(url::Host::Ipv6(v6)) => IpAddr::V6(v6),
        None => return Err("URL must have a host".to_string()),
    };

    let restricted = match host {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || matches!(v4.octets(), [100, 64..=127, ..])
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || matches!(v6.segments(), [0xfc00..=0xfdff, ..] | [0xfe80..=0xfebf, ..])
        }
    };
    if restricted {
        return Err(format!("Access to internal address {host} is not allowed"));
    }
    Ok(parsed)
}

/// Readable text of an HTML document, prefixed by its title as a heading.
pub(crate) fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut output = String::new();

    if let Ok(title_sel) = Selector::parse("title")
        && let Some(title) = document.select(&title_sel).next()
    {
        let title = title.text().collect::<String>();
        if !title.trim().is_empty() {
            output.push_str(&format!("# {}\n\n", title.trim()));
        }
    }

    let root = ["article", "main", "[role=\"main\"]", "body"]
        .iter()
        .filter_map(|sel| Selector::parse(sel).ok())
        .find_map(|sel| document.select(&sel).next())
        .unwrap_or_else(|| document.root_element());
    collect_text(root, &mut output);

    collapse_blank_lines(&output)
}

fn collect_text(element: ElementRef<'_>, output: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    output.push_str(trimmed);
                    output.push(' ');
                }
            }
            Node::Element(el) => {
                let tag = el.name();
                if SKIPPED_TAGS.contains(&tag) {
                    continue;
                }
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                let is_block = BLOCK_TAGS.contains(&tag);
                if is_block {
                    output.push('\n');
                }
                collect_text(child_ref, output);
                if is_block {
                    output.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn collapse_blank_lines(text: &str) -> String {
    let mut lines = Vec::new();
    let mut blank_run = 0;
    for line in text.lines().map(str::trim_end) {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        lines.push(line.trim_start());
    }
    lines.join("\n").trim().to_string()
}

/// Fetches a page and returns its readable text.
pub struct ExtractTextTool {
    client: Client,
    max_length: usize,
}

impl Default for ExtractTextTool {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractTextTool {
    pub fn new() -> Self {
        Self {
            client: build_http_client(),
            max_length: MAX_CONTENT_LENGTH,
        }
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }
}

#[async_trait]
impl Tool for ExtractTextTool {
    fn name(&self) -> &str {
        "extract_text_from_url"
    }

    fn description(&self) -> &str {
        "Download a web page and return its readable text (scripts, navigation and \
         styling removed). Use it on promising URLs found with web_search."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "Absolute http(s) URL of the page"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput> {
        let params: ExtractTextInput = serde_json::from_value(input)?;
        let url = match validate_url(&params.url) {
            Ok(url) => url,
            Err(reason) => return Ok(ToolOutput::error(format!("URL rejected: {reason}"))),
        };

        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => return Ok(ToolOutput::error(format!("Failed to fetch {}: {e}", params.url))),
        };
        if !response.status().is_success() {
            return Ok(ToolOutput::error(format!(
                "HTTP {} when fetching {}",
                response.status(),
                params.url
            )));
        }

        let html = match response.text().await {
            Ok(body) => body,
            Err(e) => return Ok(ToolOutput::error(format!("Failed to read body: {e}"))),
        };

        let text = html_to_text(&html);
        if text.is_empty() {
            return Ok(ToolOutput::error(format!(
                "No readable text found at {}; the page probably renders with JavaScript",
                params.url
            )));
        }
        Ok(ToolOutput::success(Value::String(truncate_with_marker(
            &text,
            self.max_length,
        ))))
    }
}
