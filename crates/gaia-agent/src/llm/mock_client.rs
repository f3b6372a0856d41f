//! Deterministic scripted turn generator for tests and dry runs.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{Duration, sleep};

use crate::error::{AiError, Result};

use super::{CompletionRequest, CompletionResponse, FinishReason, LlmClient, TokenUsage, ToolCall};

/// What a scripted step returns.
#[derive(Debug, Clone)]
pub enum MockStepKind {
    /// Plain assistant text, no tool calls.
    Text(String),
    /// Optional text plus one or more tool calls.
    ToolCalls {
        content: Option<String>,
        calls: Vec<ToolCall>,
    },
    /// Generation failure.
    Error(String),
}

/// Scripted completion step with optional delay.
#[derive(Debug, Clone)]
pub struct MockStep {
    pub delay_ms: u64,
    pub kind: MockStepKind,
}

impl MockStep {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::Text(content.into()),
        }
    }

    pub fn tool_call(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self::tool_calls(None, vec![ToolCall::new(id, name, arguments)])
    }

    pub fn tool_calls(content: Option<&str>, calls: Vec<ToolCall>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::ToolCalls {
                content: content.map(str::to_string),
                calls,
            },
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::Error(message.into()),
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

/// A request as seen by the mock, kept for assertions.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub system_prompt: String,
    pub message_count: usize,
    pub tool_names: Vec<String>,
}

/// A deterministic mock client driven by scripted steps.
///
/// Once the script runs out, every call returns the fallback step.
#[derive(Debug, Clone)]
pub struct MockLlmClient {
    model: String,
    script: Arc<Mutex<VecDeque<MockStep>>>,
    fallback: MockStep,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockLlmClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self::from_steps(model, Vec::new())
    }

    pub fn from_steps(model: impl Into<String>, steps: Vec<MockStep>) -> Self {
        Self {
            model: model.into(),
            script: Arc::new(Mutex::new(VecDeque::from(steps))),
            fallback: MockStep::text("FINAL ANSWER: mock"),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A client that answers every call with the same step.
    pub fn repeating(model: impl Into<String>, step: MockStep) -> Self {
        Self::new(model).with_fallback(step)
    }

    pub fn with_fallback(mut self, step: MockStep) -> Self {
        self.fallback = step;
        self
    }

    pub async fn push_step(&self, step: MockStep) {
        self.script.lock().await.push_back(step);
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    fn usage_for(content_len: usize) -> TokenUsage {
        let completion_tokens = content_len as u32;
        TokenUsage {
            prompt_tokens: 1,
            completion_tokens,
            total_tokens: 1 + completion_tokens,
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.requests.lock().await.push(RecordedRequest {
            system_prompt: request.system_prompt.clone(),
            message_count: request.messages.len(),
            tool_names: request.tools.iter().map(|t| t.name.clone()).collect(),
        });

        let step = self
            .script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        if step.delay_ms > 0 {
            sleep(Duration::from_millis(step.delay_ms)).await;
        }

        match step.kind {
            MockStepKind::Text(content) => Ok(CompletionResponse {
                usage: Some(Self::usage_for(content.len())),
                content: Some(content),
                tool_calls: Vec::new(),
                finish_reason: FinishReason::Stop,
            }),
            MockStepKind::ToolCalls { content, calls } => Ok(CompletionResponse {
                usage: Some(Self::usage_for(content.as_deref().map_or(0, str::len))),
                content,
                tool_calls: calls,
                finish_reason: FinishReason::ToolCalls,
            }),
            MockStepKind::Error(message) => Err(AiError::Llm(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ConversationTurn;

    fn request() -> CompletionRequest {
        CompletionRequest::new("sys", vec![ConversationTurn::user("ping")])
    }

    #[tokio::test]
    async fn mock_client_returns_scripted_steps_then_fallback() {
        let client = MockLlmClient::from_steps(
            "mock-model",
            vec![
                MockStep::tool_call("call-1", "web_search", serde_json::json!({"query": "x"})),
                MockStep::text("hello"),
            ],
        );

        let first = client.complete(request()).await.unwrap();
        assert_eq!(first.finish_reason, FinishReason::ToolCalls);
        assert_eq!(first.tool_calls[0].name, "web_search");

        let second = client.complete(request()).await.unwrap();
        assert_eq!(second.content.as_deref(), Some("hello"));

        let third = client.complete(request()).await.unwrap();
        assert_eq!(third.content.as_deref(), Some("FINAL ANSWER: mock"));
        assert_eq!(client.call_count().await, 3);
    }

    #[tokio::test]
    async fn mock_client_returns_errors() {
        let client = MockLlmClient::from_steps("mock-model", vec![MockStep::error("boom")]);
        let err = client.complete(request()).await.unwrap_err();
        assert!(matches!(err, AiError::Llm(ref m) if m == "boom"));
    }

    #[tokio::test]
    async fn mock_client_records_requests() {
        let client = MockLlmClient::new("mock-model");
        client.complete(request()).await.unwrap();

        let recorded = client.requests().await;
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].system_prompt, "sys");
        assert_eq!(recorded[0].message_count, 1);
    }
}
