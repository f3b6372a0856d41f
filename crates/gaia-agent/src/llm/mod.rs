//! Turn generator abstraction and providers

mod client;
mod mock_client;
mod openai;
mod retry;

pub use client::{
    CompletionRequest, CompletionResponse, ConversationTurn, FinishReason, LlmClient, Role,
    TokenUsage, ToolCall,
};
pub use mock_client::{MockLlmClient, MockStep, MockStepKind, RecordedRequest};
pub use openai::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL, OpenAIClient};
pub use retry::LlmRetryConfig;
