//! Reason-act-observe state machine

use std::sync::Arc;

use chrono::Utc;
use tracing::Instrument;

use crate::agent::config::AgentConfig;
use crate::agent::confidence::estimate_confidence;
use crate::agent::output::{OutputNormalizer, RunResult};
use crate::agent::prompt::{DEFAULT_SYSTEM_PROMPT, build_system_prompt, decorate_question};
use crate::agent::reasoning::{PatternReasoningExtractor, ReasoningExtractor};
use crate::agent::state::{RunPhase, RunState};
use crate::agent::tool_exec::ToolExecutor;
use crate::error::Result;
use crate::llm::{CompletionRequest, LlmClient, ToolCall};
use crate::tools::ToolRegistry;

/// Loop position. Every non-terminal variant owns the complete run state.
#[derive(Debug, Clone)]
pub enum LoopState {
    AwaitingModel(RunState),
    ExecutingTools(RunState, Vec<ToolCall>),
    PreparingOutput(RunState),
    Done(Box<RunResult>),
}

impl LoopState {
    pub fn name(&self) -> &'static str {
        match self {
            LoopState::AwaitingModel(_) => "awaiting_model",
            LoopState::ExecutingTools(..) => "executing_tools",
            LoopState::PreparingOutput(_) => "preparing_output",
            LoopState::Done(_) => "done",
        }
    }
}

/// Drives one question from the seeded conversation to a [`RunResult`].
#[derive(Clone)]
pub struct AgentLoop {
    llm: Arc<dyn LlmClient>,
    tools: ToolExecutor,
    config: AgentConfig,
    reasoning: Arc<dyn ReasoningExtractor>,
    normalizer: OutputNormalizer,
}

impl AgentLoop {
    pub fn new(llm: Arc<dyn LlmClient>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        Self {
            tools: ToolExecutor::new(tools, &config),
            llm,
            config,
            reasoning: Arc::new(PatternReasoningExtractor::new()),
            normalizer: OutputNormalizer::default(),
        }
    }

    pub fn with_reasoning_extractor(mut self, extractor: Arc<dyn ReasoningExtractor>) -> Self {
        self.reasoning = extractor;
        self
    }

    pub fn with_output_normalizer(mut self, normalizer: OutputNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Initial state for a question, with the attachment block when a file is attached.
    pub fn start(&self, question: &str, task_id: &str, attached_file_name: Option<&str>) -> RunState {
        RunState::new(
            decorate_question(question, task_id, attached_file_name),
            task_id,
            attached_file_name.map(str::to_string),
        )
    }

    /// Run a question to completion.
    pub async fn run(
        &self,
        question: &str,
        task_id: &str,
        attached_file_name: Option<&str>,
    ) -> Result<RunResult> {
        self.drive(self.start(question, task_id, attached_file_name))
            .await
    }

    /// Drive an already-created state until `Done`. Errors from the turn
    /// generator abort the run and propagate.
    pub async fn drive(&self, state: RunState) -> Result<RunResult> {
        let span = tracing::info_span!("gaia_run", run_id = %state.run_id, task_id = %state.task_id);
        async move {
            let budget = self.config.effective_step_budget();
            tracing::info!(model = self.llm.model(), budget, "Starting run");

            let mut model_calls = 0usize;
            let mut current = LoopState::AwaitingModel(state);
            loop {
                current = match current {
                    LoopState::Done(result) => {
                        tracing::info!(
                            answer = %result.submitted_answer,
                            confidence = result.confidence,
                            model_calls,
                            "Run finished"
                        );
                        return Ok(*result);
                    }
                    LoopState::AwaitingModel(state) => {
                        let exhausted = model_calls + 1 >= budget;
                        model_calls += 1;
                        self.step(LoopState::AwaitingModel(state.with_budget_exhausted(exhausted)))
                            .await?
                    }
                    other => self.step(other).await?,
                };
            }
        }
        .instrument(span)
        .await
    }

    /// Perform exactly one transition.
    pub async fn step(&self, current: LoopState) -> Result<LoopState> {
        tracing::debug!(state = current.name(), "Loop transition");
        match current {
            LoopState::AwaitingModel(state) => self.await_model(state).await,
            LoopState::ExecutingTools(state, calls) => Ok(self.execute_tools(state, calls).await),
            LoopState::PreparingOutput(state) => Ok(self.prepare_output(state)),
            done @ LoopState::Done(_) => Ok(done),
        }
    }

    async fn await_model(&self, state: RunState) -> Result<LoopState> {
        let template = self
            .config
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);
        let mut request = CompletionRequest::new(
            build_system_prompt(template, &state, Utc::now()),
            state.conversation.clone(),
        )
        .with_tools(self.tools.schemas());
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.config.max_output_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let turn = self.llm.complete(request).await?.into_turn();
        let calls = turn.tool_calls().to_vec();
        let state = state.with_turn(turn);

        if calls.is_empty() {
            return Ok(LoopState::PreparingOutput(state.with_phase(RunPhase::Reasoning)));
        }
        if state.step_budget_exhausted {
            tracing::warn!(
                pending = calls.len(),
                "Step budget exhausted with pending tool calls; stopping"
            );
            return Ok(LoopState::PreparingOutput(state.with_error()));
        }
        let phase = RunPhase::UsingTools(calls.len());
        Ok(LoopState::ExecutingTools(state.with_phase(phase), calls))
    }

    async fn execute_tools(&self, state: RunState, calls: Vec<ToolCall>) -> LoopState {
        let round = self.tools.execute(&calls, &state.tools_used).await;
        LoopState::AwaitingModel(
            state
                .with_turns(round.turns)
                .with_tools_used(round.tools_used),
        )
    }

    fn prepare_output(&self, state: RunState) -> LoopState {
        let steps = self.reasoning.extract(&state.conversation);
        let state = state.with_reasoning_steps(steps);
        let confidence = estimate_confidence(
            state.last_text(),
            &state.tools_used,
            &state.reasoning_steps,
            state.error_count,
        );
        LoopState::Done(Box::new(self.normalizer.normalize(
            state,
            confidence,
            Utc::now(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlmClient, MockStep};
    use serde_json::json;

    fn agent(steps: Vec<MockStep>, budget: usize) -> AgentLoop {
        AgentLoop::new(
            Arc::new(MockLlmClient::from_steps("mock", steps)),
            Arc::new(ToolRegistry::new()),
            AgentConfig::default().with_step_budget(budget),
        )
    }

    #[tokio::test]
    async fn test_text_turn_goes_to_output() {
        let agent = agent(vec![MockStep::text("FINAL ANSWER: 4")], 5);
        let state = agent.start("What is 2+2?", "", None);

        let next = agent.step(LoopState::AwaitingModel(state)).await.unwrap();
        assert!(matches!(next, LoopState::PreparingOutput(_)));
        let done = agent.step(next).await.unwrap();
        let LoopState::Done(result) = done else {
            panic!("expected done");
        };
        assert_eq!(result.submitted_answer, "4");
    }

    #[tokio::test]
    async fn test_tool_turn_with_budget_left_executes_tools() {
        let agent = agent(
            vec![MockStep::tool_call("c1", "web_search", json!({"query": "x"}))],
            5,
        );
        let state = agent.start("q", "t1", None);

        let next = agent.step(LoopState::AwaitingModel(state)).await.unwrap();
        let LoopState::ExecutingTools(state, calls) = next else {
            panic!("expected tool execution");
        };
        assert_eq!(calls.len(), 1);
        assert_eq!(state.current_phase, RunPhase::UsingTools(1));

        let back = agent
            .step(LoopState::ExecutingTools(state, calls))
            .await
            .unwrap();
        let LoopState::AwaitingModel(state) = back else {
            panic!("expected model turn");
        };
        assert_eq!(state.tools_used, vec!["web_search"]);
        assert_eq!(state.conversation.len(), 3);
    }

    #[tokio::test]
    async fn test_tool_turn_on_last_step_counts_error() {
        let agent = agent(
            vec![MockStep::tool_call("c1", "web_search", json!({}))],
            5,
        );
        let state = agent.start("q", "", None).with_budget_exhausted(true);

        let next = agent.step(LoopState::AwaitingModel(state)).await.unwrap();
        let LoopState::PreparingOutput(state) = next else {
            panic!("expected output preparation");
        };
        assert_eq!(state.error_count, 1);
        assert_eq!(state.conversation.len(), 2);
        assert!(state.tools_used.is_empty());
    }

    #[tokio::test]
    async fn test_generation_error_aborts() {
        let agent = agent(vec![MockStep::error("model offline")], 5);
        let err = agent.run("q", "", None).await.unwrap_err();
        assert!(err.to_string().contains("model offline"));
    }
}
