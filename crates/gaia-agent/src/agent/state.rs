//! Per-question run state

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::llm::ConversationTurn;

/// Descriptive phase label surfaced in the prompt context block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    Reasoning,
    UsingTools(usize),
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::Reasoning => write!(f, "reasoning"),
            RunPhase::UsingTools(n) => write!(f, "using_tools({n})"),
        }
    }
}

/// State threaded through every loop iteration.
///
/// Every transition consumes the previous value and returns the complete next
/// one. `conversation`, `tools_used` and `reasoning_steps` only grow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: String,
    pub conversation: Vec<ConversationTurn>,
    pub task_id: String,
    pub attached_file_name: Option<String>,
    /// Tool names in first-use order, without duplicates
    pub tools_used: Vec<String>,
    /// Extracted reasoning steps in discovery order, without duplicates
    pub reasoning_steps: Vec<String>,
    pub current_phase: RunPhase,
    pub error_count: u32,
    pub started_at: DateTime<Utc>,
    /// Set by the driver while the last permitted model call is running
    pub step_budget_exhausted: bool,
}

impl RunState {
    /// Create a new run seeded with the (already decorated) question.
    pub fn new(
        question: impl Into<String>,
        task_id: impl Into<String>,
        attached_file_name: Option<String>,
    ) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            conversation: vec![ConversationTurn::user(question)],
            task_id: task_id.into(),
            attached_file_name: attached_file_name.filter(|name| !name.trim().is_empty()),
            tools_used: Vec::new(),
            reasoning_steps: Vec::new(),
            current_phase: RunPhase::Reasoning,
            error_count: 0,
            started_at: Utc::now(),
            step_budget_exhausted: false,
        }
    }

    pub fn has_file(&self) -> bool {
        self.attached_file_name.is_some()
    }

    /// Text of the last turn, empty when the conversation is empty.
    pub fn last_text(&self) -> &str {
        self.conversation
            .last()
            .map(ConversationTurn::content)
            .unwrap_or_default()
    }

    pub fn with_turn(mut self, turn: ConversationTurn) -> Self {
        self.conversation.push(turn);
        self
    }

    pub fn with_turns(mut self, turns: impl IntoIterator<Item = ConversationTurn>) -> Self {
        self.conversation.extend(turns);
        self
    }

    /// Union of the recorded tool names with `names`.
    pub fn with_tools_used<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        merge_unique(&mut self.tools_used, names.into_iter().map(Into::into));
        self
    }

    /// Append reasoning steps not already present.
    pub fn with_reasoning_steps(mut self, steps: impl IntoIterator<Item = String>) -> Self {
        merge_unique(&mut self.reasoning_steps, steps);
        self
    }

    pub fn with_phase(mut self, phase: RunPhase) -> Self {
        self.current_phase = phase;
        self
    }

    pub fn with_budget_exhausted(mut self, exhausted: bool) -> Self {
        self.step_budget_exhausted = exhausted;
        self
    }

    pub fn with_error(mut self) -> Self {
        self.error_count += 1;
        self
    }
}

/// Append each item of `items` that is not yet in `target`, keeping order.
pub(crate) fn merge_unique(target: &mut Vec<String>, items: impl IntoIterator<Item = String>) {
    for item in items {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_seeds_question() {
        let state = RunState::new("What is 2+2?", "t1", Some(String::new()));
        assert_eq!(state.conversation.len(), 1);
        assert_eq!(state.last_text(), "What is 2+2?");
        assert_eq!(state.attached_file_name, None);
        assert_eq!(state.current_phase, RunPhase::Reasoning);
        assert!(!state.run_id.is_empty());
    }

    #[test]
    fn test_tools_used_is_a_union() {
        let state = RunState::new("q", "", None)
            .with_tools_used(["web_search", "read_file"])
            .with_tools_used(["web_search", "extract_text_from_url"]);
        assert_eq!(
            state.tools_used,
            vec!["web_search", "read_file", "extract_text_from_url"]
        );
    }

    #[test]
    fn test_reasoning_steps_suppress_duplicates() {
        let state = RunState::new("q", "", None)
            .with_reasoning_steps(vec!["Reasoning: a".to_string()])
            .with_reasoning_steps(vec!["Reasoning: a".to_string(), "Reasoning: b".to_string()]);
        assert_eq!(state.reasoning_steps, vec!["Reasoning: a", "Reasoning: b"]);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(RunPhase::Reasoning.to_string(), "reasoning");
        assert_eq!(RunPhase::UsingTools(3).to_string(), "using_tools(3)");
    }
}
