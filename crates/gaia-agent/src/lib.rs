//! GAIA Agent - autonomous question answering for the GAIA benchmark
//!
//! This crate provides:
//! - Bounded reason-act-observe loop with an explicit state machine
//! - Reasoning extraction, confidence scoring and answer normalization
//! - OpenAI-compatible turn generator plus a scripted mock
//! - Tool registry with web search, page extraction, task files, spreadsheets,
//!   image analysis and Python
//! - Client for the benchmark scoring service

pub mod agent;
pub mod benchmark;
pub mod error;
mod http_client;
pub mod llm;
pub mod text_utils;
pub mod tools;

// Re-export commonly used types
pub use agent::{
    AgentConfig, AgentLoop, GaiaRunner, LoopState, RunPhase, RunResult, RunState, RunnerConfig,
    ToolExecutor, estimate_confidence,
};
pub use benchmark::{
    AnswerSubmission, BenchmarkClient, BenchmarkQuestion, DEFAULT_BENCHMARK_URL, DownloadedFile,
    SubmissionOutcome,
};
pub use error::{AiError, Result};
pub use llm::{
    CompletionRequest, CompletionResponse, ConversationTurn, LlmClient, MockLlmClient, MockStep,
    OpenAIClient, Role, ToolCall,
};
pub use tools::{
    Tool, ToolOutput, ToolRegistry, ToolSchema, ToolSettings, default_download_dir,
    default_registry,
};
