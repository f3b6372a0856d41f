//! Caller-facing entry point: never fails, always yields a [`RunResult`].

use std::time::Duration;

use chrono::Utc;

use crate::agent::output::RunResult;
use crate::agent::run_loop::AgentLoop;
use crate::error::AiError;

/// Options applied around each run.
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    /// Wall-clock limit per question; exceeding it yields the error result.
    pub question_timeout: Option<Duration>,
}

impl RunnerConfig {
    pub fn with_question_timeout(mut self, timeout: Duration) -> Self {
        self.question_timeout = Some(timeout);
        self
    }
}

/// Wraps an [`AgentLoop`] and converts failures into degenerate results.
#[derive(Clone)]
pub struct GaiaRunner {
    agent: AgentLoop,
    config: RunnerConfig,
}

impl GaiaRunner {
    pub fn new(agent: AgentLoop) -> Self {
        Self {
            agent,
            config: RunnerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn agent(&self) -> &AgentLoop {
        &self.agent
    }

    /// Solve one question. Empty `task_id` and `attached_file_name` mean none.
    pub async fn solve(&self, question: &str, task_id: &str, attached_file_name: &str) -> RunResult {
        let file = Some(attached_file_name).filter(|name| !name.trim().is_empty());
        let state = self.agent.start(question, task_id, file);
        let run_id = state.run_id.clone();
        let started_at = state.started_at;

        let outcome = match self.config.question_timeout {
            Some(limit) => tokio::time::timeout(limit, self.agent.drive(state))
                .await
                .unwrap_or_else(|_| Err(AiError::Timeout(limit.as_secs()))),
            None => self.agent.drive(state).await,
        };

        match outcome {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(run_id = %run_id, task_id, error = %e, "Run failed");
                let elapsed = (Utc::now() - started_at)
                    .to_std()
                    .map(|d| d.as_secs_f64())
                    .unwrap_or(0.0);
                RunResult::failed(run_id, task_id, &e.to_string(), Vec::new(), elapsed)
            }
        }
    }
}
