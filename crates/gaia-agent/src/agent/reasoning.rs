//! Heuristic extraction of planning statements from assistant text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::agent::state::merge_unique;
use crate::llm::{ConversationTurn, Role};
use crate::text_utils::take_chars;

pub const REASONING_PREFIX: &str = "Reasoning: ";
const MAX_STEP_CHARS: usize = 100;

static PLANNING_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)I need to (.+)",
        r"(?i)Let me (.+)",
        r"(?i)First, I will (.+)",
        r"(?i)To answer this, I (.+)",
        r"(?i)I'll (.+)",
        r"(?i)My approach (.+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("Invalid regex"))
    .collect()
});

/// Turns a transcript into short labelled reasoning steps.
///
/// Implementations must be deterministic: the same transcript always yields
/// the same ordered, duplicate-free sequence.
pub trait ReasoningExtractor: Send + Sync {
    fn extract(&self, conversation: &[ConversationTurn]) -> Vec<String>;
}

/// Matches first-person planning phrases ("I need to", "Let me", ...).
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternReasoningExtractor;

impl PatternReasoningExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_from_text(text: &str, out: &mut Vec<String>) {
        for pattern in PLANNING_PATTERNS.iter() {
            let found = pattern
                .captures_iter(text)
                .filter_map(|caps| caps.get(1))
                .map(|m| format!("{REASONING_PREFIX}{}", take_chars(m.as_str(), MAX_STEP_CHARS)));
            merge_unique(out, found);
        }
    }
}

impl ReasoningExtractor for PatternReasoningExtractor {
    fn extract(&self, conversation: &[ConversationTurn]) -> Vec<String> {
        let mut steps = Vec::new();
        for turn in conversation.iter().filter(|t| t.role() == Role::Assistant) {
            Self::extract_from_text(turn.content(), &mut steps);
        }
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolCall;
    use serde_json::json;

    fn extract(turns: &[ConversationTurn]) -> Vec<String> {
        PatternReasoningExtractor::new().extract(turns)
    }

    #[test]
    fn test_extracts_planning_phrases_in_order() {
        let turns = vec![
            ConversationTurn::user("I need to ignore user text"),
            ConversationTurn::assistant("I need to find the album list.\nLet me search Wikipedia."),
            ConversationTurn::assistant("my approach is to count them"),
        ];
        assert_eq!(
            extract(&turns),
            vec![
                "Reasoning: find the album list.",
                "Reasoning: search Wikipedia.",
                "Reasoning: is to count them",
            ]
        );
    }

    #[test]
    fn test_deduplicates_across_turns() {
        let turns = vec![
            ConversationTurn::assistant("Let me check the date"),
            ConversationTurn::assistant("Let me check the date"),
        ];
        assert_eq!(extract(&turns), vec!["Reasoning: check the date"]);
    }

    #[test]
    fn test_is_idempotent_and_append_only() {
        let mut turns = vec![ConversationTurn::assistant_with_tool_calls(
            Some("First, I will look up the paper.".to_string()),
            vec![ToolCall::new("c1", "web_search", json!({"query": "paper"}))],
        )];
        let first = extract(&turns);
        assert_eq!(first, extract(&turns));

        turns.push(ConversationTurn::assistant("I'll read the abstract next."));
        let grown = extract(&turns);
        assert_eq!(&grown[..first.len()], first.as_slice());
        assert_eq!(grown.last().map(String::as_str), Some("Reasoning: read the abstract next."));
    }

    #[test]
    fn test_truncates_to_one_hundred_chars() {
        let long = format!("Let me {}", "x".repeat(250));
        let steps = extract(&[ConversationTurn::assistant(long)]);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].chars().count(), REASONING_PREFIX.len() + 100);
    }

    #[test]
    fn test_captured_remainder_is_kept_verbatim() {
        let turns = vec![ConversationTurn::assistant(
            "Let me   \r\nI need to  look it up\r\n",
        )];
        assert_eq!(
            extract(&turns),
            vec!["Reasoning:  look it up\r", "Reasoning:   \r"]
        );
    }

    #[test]
    fn test_no_match_yields_nothing() {
        assert!(extract(&[ConversationTurn::assistant("FINAL ANSWER: 4")]).is_empty());
    }
}
