//! Agent module - bounded ReAct loop and post-hoc run analysis

pub mod confidence;
pub mod config;
pub mod output;
pub mod prompt;
pub mod reasoning;
pub mod run_loop;
pub mod runner;
pub mod state;
pub mod tool_exec;

pub use confidence::estimate_confidence;
pub use config::{AgentConfig, DEFAULT_MAX_TOOL_CONCURRENCY, DEFAULT_STEP_BUDGET};
pub use output::{
    AnswerExtractor, ERROR_ANSWER, ExtractedAnswer, MarkerAnswerExtractor, OutputNormalizer,
    RunResult, contains_answer_marker, format_reasoning_trace,
};
pub use prompt::{DEFAULT_SYSTEM_PROMPT, build_system_prompt, context_block, decorate_question};
pub use reasoning::{PatternReasoningExtractor, REASONING_PREFIX, ReasoningExtractor};
pub use run_loop::{AgentLoop, LoopState};
pub use runner::{GaiaRunner, RunnerConfig};
pub use state::{RunPhase, RunState};
pub use tool_exec::{ToolExecutor, ToolRound};
