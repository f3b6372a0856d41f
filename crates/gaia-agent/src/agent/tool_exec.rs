use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesOrdered;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};

use crate::agent::config::AgentConfig;
use crate::agent::state::merge_unique;
use crate::error::AiError;
use crate::llm::{ConversationTurn, ToolCall};
use crate::text_utils::truncate_with_marker;
use crate::tools::{ToolRegistry, ToolSchema};

/// Outcome of one tool round: one result turn per call, in request order.
#[derive(Debug, Clone)]
pub struct ToolRound {
    pub turns: Vec<ConversationTurn>,
    /// Previously seen names united with this round's names
    pub tools_used: Vec<String>,
}

/// Spawned tool task that is aborted when dropped, so a cancelled round
/// leaves nothing running in the background.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Future for AbortOnDrop<T> {
    type Output = std::result::Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Runs requested tool calls and records which tools were exercised.
///
/// Never fails: unknown tools, tool errors, timeouts and panics all become
/// `Error: ...` text in the corresponding result turn.
#[derive(Clone)]
pub struct ToolExecutor {
    tools: Arc<ToolRegistry>,
    timeout: Duration,
    max_concurrency: usize,
    max_result_length: usize,
}

impl ToolExecutor {
    pub fn new(tools: Arc<ToolRegistry>, config: &AgentConfig) -> Self {
        Self {
            tools,
            timeout: config.tool_timeout,
            max_concurrency: config.max_tool_concurrency.max(1),
            max_result_length: config.max_tool_result_length,
        }
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.schemas()
    }

    pub async fn execute(&self, calls: &[ToolCall], tools_used: &[String]) -> ToolRound {
        let outputs = if self.max_concurrency <= 1 {
            self.execute_sequential(calls).await
        } else {
            self.execute_parallel(calls).await
        };

        let turns = calls
            .iter()
            .zip(outputs)
            .map(|(call, text)| {
                ConversationTurn::tool_result(call, truncate_with_marker(&text, self.max_result_length))
            })
            .collect();

        let mut names = tools_used.to_vec();
        merge_unique(&mut names, calls.iter().map(|c| c.name.clone()));
        ToolRound {
            turns,
            tools_used: names,
        }
    }

    async fn execute_sequential(&self, calls: &[ToolCall]) -> Vec<String> {
        let mut outputs = Vec::with_capacity(calls.len());
        for call in calls {
            outputs.push(Self::run_call(Arc::clone(&self.tools), call.clone(), self.timeout).await);
        }
        outputs
    }

    async fn execute_parallel(&self, calls: &[ToolCall]) -> Vec<String> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut ordered = FuturesOrdered::new();

        for call in calls {
            let tools = Arc::clone(&self.tools);
            let sem = Arc::clone(&semaphore);
            let call = call.clone();
            let timeout = self.timeout;
            let name = call.name.clone();

            let task = AbortOnDrop(tokio::spawn(async move {
                let Ok(_permit) = sem.acquire().await else {
                    return "Error: Tool concurrency semaphore closed".to_string();
                };
                Self::run_call(tools, call, timeout).await
            }));

            ordered.push_back(async move {
                match task.await {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(tool = %name, error = %e, "Tool task panicked");
                        format!("Error: Tool task panicked: {e}")
                    }
                }
            });
        }

        ordered.collect().await
    }

    async fn run_call(tools: Arc<ToolRegistry>, call: ToolCall, timeout: Duration) -> String {
        tracing::debug!(tool = %call.name, id = %call.id, "Executing tool call");
        let result = tokio::time::timeout(timeout, tools.execute(&call.name, call.arguments))
            .await
            .map_err(|_| AiError::Tool(format!("Tool {} timed out after {}s", call.name, timeout.as_secs())))
            .and_then(|r| r);

        match result {
            Ok(output) => {
                if !output.success {
                    tracing::debug!(tool = %call.name, error = ?output.error, "Tool reported failure");
                }
                output.render()
            }
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool call failed");
                format!("Error: {e}")
            }
        }
    }
}
