//! Image analysis through an OpenAI-compatible vision model.

use std::path::Path;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{AiError, Result};
use crate::http_client::build_http_client;
use crate::llm::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL};
use crate::tools::files::detect_mime_type;
use crate::tools::traits::{SecretResolver, Tool, ToolOutput, env_secret_resolver};

pub const DESCRIBE_IMAGE_PROMPT: &str = "Describe everything you see in this image in detail, \
     including objects, people, text, colours and any other relevant detail.";
const MAX_VISION_TOKENS: u32 = 1000;

#[derive(Debug, Deserialize)]
struct AnalyzeImageInput {
    file_path: String,
    query: String,
}

/// Answers a question about a local image with a vision model.
#[derive(Clone)]
pub struct AnalyzeImageTool {
    client: Client,
    secret_resolver: SecretResolver,
    base_url: String,
    model: String,
}

impl Default for AnalyzeImageTool {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyzeImageTool {
    pub fn new() -> Self {
        Self {
            client: build_http_client(),
            secret_resolver: env_secret_resolver(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
        }
    }

    pub fn with_secret_resolver(mut self, resolver: SecretResolver) -> Self {
        self.secret_resolver = resolver;
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Ask `query` about the image at `file_path`. Failures are error outputs.
    pub async fn analyze(&self, file_path: &str, query: &str) -> Result<ToolOutput> {
        let mime_type = detect_mime_type(Path::new(file_path));
        if !mime_type.starts_with("image/") {
            return Ok(ToolOutput::error(format!(
                "File is not an image: {file_path} ({mime_type})"
            )));
        }
        let Some(api_key) = (self.secret_resolver)("OPENAI_API_KEY") else {
            return Ok(ToolOutput::error("Missing OPENAI_API_KEY"));
        };
        let bytes = match tokio::fs::read(file_path).await {
            Ok(bytes) => bytes,
            Err(e) => return Ok(ToolOutput::error(format!("Cannot read {file_path}: {e}"))),
        };

        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        let payload = json!({
            "model": self.model,
            "max_tokens": MAX_VISION_TOKENS,
            "messages": [
                {
                    "role": "user",
                    "content": [
                        {
                            "type": "text",
                            "text": format!("Analyze this image and answer the question: {query}")
                        },
                        {
                            "type": "image_url",
                            "image_url": {"url": format!("data:{mime_type};base64,{encoded}")}
                        }
                    ]
                }
            ]
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await;
        let response = match response {
            Ok(response) => response,
            Err(err) => return Ok(ToolOutput::error(err.to_string())),
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Ok(ToolOutput::error(format!(
                "Vision API error ({}): {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: Value = serde_json::from_str(&body).map_err(AiError::from)?;
        let answer = parsed
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default();
        tracing::debug!(file_path, model = %self.model, "Image analyzed");

        Ok(ToolOutput::success(json!({
            "answer": answer,
            "file_path": file_path,
            "model": self.model
        })))
    }
}

#[async_trait]
impl Tool for AnalyzeImageTool {
    fn name(&self) -> &str {
        "analyze_image"
    }

    fn description(&self) -> &str {
        "Answer a specific question about an image file (png, jpg, gif, webp) using a \
         vision model."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path to the image file on disk"
                },
                "query": {
                    "type": "string",
                    "description": "Question to answer about the image"
                }
            },
            "required": ["file_path", "query"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput> {
        let params: AnalyzeImageInput = serde_json::from_value(input)?;
        self.analyze(&params.file_path, &params.query).await
    }
}

#[derive(Debug, Deserialize)]
struct DescribeImageInput {
    file_path: String,
}

/// General description of an image; [`AnalyzeImageTool`] with a fixed prompt.
#[derive(Clone)]
pub struct DescribeImageTool {
    inner: AnalyzeImageTool,
}

impl DescribeImageTool {
    pub fn new(inner: AnalyzeImageTool) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Tool for DescribeImageTool {
    fn name(&self) -> &str {
        "describe_image"
    }

    fn description(&self) -> &str {
        "Describe the full content of an image file: objects, people, text and colours."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path to the image file on disk"
                }
            },
            "required": ["file_path"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput> {
        let params: DescribeImageInput = serde_json::from_value(input)?;
        self.inner
            .analyze(&params.file_path, DESCRIBE_IMAGE_PROMPT)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn with_key() -> SecretResolver {
        Arc::new(|key: &str| (key == "OPENAI_API_KEY").then(|| "sk-test".to_string()))
    }

    fn write_png(dir: &tempfile::TempDir) -> String {
        let path = dir.path().join("chart.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();
        path.display().to_string()
    }

    #[tokio::test]
    async fn test_non_image_is_rejected() {
        let output = AnalyzeImageTool::new()
            .with_secret_resolver(with_key())
            .analyze("/tmp/table.csv", "what is this?")
            .await
            .unwrap();
        assert!(!output.success);
        assert!(output.render().contains("not an image"));
    }

    #[tokio::test]
    async fn test_requires_api_key() {
        let output = AnalyzeImageTool::new()
            .with_secret_resolver(Arc::new(|_| None))
            .analyze("/tmp/does-not-exist.png", "what is this?")
            .await
            .unwrap();
        assert!(output.render().contains("OPENAI_API_KEY"));
    }

    #[tokio::test]
    async fn test_analyze_sends_image_and_returns_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_string_contains("data:image/png;base64,iVBORw=="))
            .and(body_string_contains("How many bars?"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "There are 7 bars."}}]
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file_path = write_png(&dir);
        let tool = AnalyzeImageTool::new()
            .with_secret_resolver(with_key())
            .with_base_url(server.uri());
        let output = tool
            .execute(json!({"file_path": file_path, "query": "How many bars?"}))
            .await
            .unwrap();

        assert!(output.success);
        assert_eq!(output.result["answer"], "There are 7 bars.");
        assert_eq!(output.result["model"], DEFAULT_OPENAI_MODEL);
    }

    #[tokio::test]
    async fn test_describe_uses_fixed_prompt_and_reports_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("Describe everything you see"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file_path = write_png(&dir);
        let tool = DescribeImageTool::new(
            AnalyzeImageTool::new()
                .with_secret_resolver(with_key())
                .with_base_url(server.uri()),
        );
        let output = tool.execute(json!({ "file_path": file_path })).await.unwrap();

        assert_eq!(output.render(), "Error: Vision API error (429): slow down");
    }
}
