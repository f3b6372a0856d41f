//! Final answer extraction and result assembly

use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::agent::state::RunState;
use crate::llm::ConversationTurn;

pub const ERROR_ANSWER: &str = "ERROR";

static ANSWER_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)FINAL ANSWER:").expect("Invalid regex"));

/// Whether `text` carries the final answer marker (case-insensitive).
pub fn contains_answer_marker(text: &str) -> bool {
    ANSWER_MARKER.is_match(text)
}

/// Terminal snapshot of one run; the only value that leaves the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: String,
    pub task_id: String,
    pub conversation: Vec<ConversationTurn>,
    pub final_answer_text: String,
    pub submitted_answer: String,
    pub reasoning_trace: String,
    pub confidence: f64,
    pub tools_used: Vec<String>,
    pub processing_time_seconds: f64,
    pub steps_taken: usize,
    pub errors_encountered: u32,
}

impl RunResult {
    /// Degenerate result for a run that aborted or timed out.
    pub fn failed(
        run_id: impl Into<String>,
        task_id: impl Into<String>,
        message: &str,
        conversation: Vec<ConversationTurn>,
        processing_time_seconds: f64,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            task_id: task_id.into(),
            conversation,
            final_answer_text: format!("{ERROR_ANSWER}: {message}"),
            submitted_answer: ERROR_ANSWER.to_string(),
            reasoning_trace: String::new(),
            confidence: 0.0,
            tools_used: Vec::new(),
            processing_time_seconds,
            steps_taken: 0,
            errors_encountered: 1,
        }
    }

    pub fn is_error(&self) -> bool {
        self.submitted_answer == ERROR_ANSWER
    }
}

/// Answer payload pulled out of the last turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedAnswer {
    pub final_answer_text: String,
    pub submitted_answer: String,
}

/// Pulls the answer out of the final turn text.
pub trait AnswerExtractor: Send + Sync {
    fn extract(&self, last_text: &str) -> ExtractedAnswer;
}

/// Takes the text after the last `FINAL ANSWER:` marker, or the whole text.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkerAnswerExtractor;

impl AnswerExtractor for MarkerAnswerExtractor {
    fn extract(&self, last_text: &str) -> ExtractedAnswer {
        let answer = match ANSWER_MARKER.find_iter(last_text).last() {
            Some(marker) => last_text[marker.end()..].trim(),
            None => last_text.trim(),
        };
        ExtractedAnswer {
            final_answer_text: answer.to_string(),
            submitted_answer: answer.to_string(),
        }
    }
}

/// `Step N: ...` lines, 1-indexed.
pub fn format_reasoning_trace(steps: &[String]) -> String {
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| format!("Step {}: {step}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the [`RunResult`] from a terminal state.
#[derive(Clone)]
pub struct OutputNormalizer {
    extractor: Arc<dyn AnswerExtractor>,
}

impl Default for OutputNormalizer {
    fn default() -> Self {
        Self::new(Arc::new(MarkerAnswerExtractor))
    }
}

impl OutputNormalizer {
    pub fn new(extractor: Arc<dyn AnswerExtractor>) -> Self {
        Self { extractor }
    }

    pub fn normalize(&self, state: RunState, confidence: f64, finished_at: DateTime<Utc>) -> RunResult {
        let answer = self.extractor.extract(state.last_text());
        let elapsed = (finished_at - state.started_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        RunResult {
            reasoning_trace: format_reasoning_trace(&state.reasoning_steps),
            steps_taken: state.reasoning_steps.len(),
            final_answer_text: answer.final_answer_text,
            submitted_answer: answer.submitted_answer,
            confidence,
            processing_time_seconds: elapsed,
            errors_encountered: state.error_count,
            tools_used: state.tools_used,
            run_id: state.run_id,
            task_id: state.task_id,
            conversation: state.conversation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn extract(text: &str) -> ExtractedAnswer {
        MarkerAnswerExtractor.extract(text)
    }

    #[test]
    fn test_extracts_after_marker() {
        let answer = extract("Counting the albums...blah FINAL ANSWER: 42  \n");
        assert_eq!(answer.final_answer_text, "42");
        assert_eq!(answer.submitted_answer, "42");
    }

    #[test]
    fn test_marker_is_case_insensitive_and_last_wins() {
        assert_eq!(extract("final answer: draft\nFinal Answer: Paris").final_answer_text, "Paris");
    }

    #[test]
    fn test_falls_back_to_trimmed_text() {
        let answer = extract("  The answer is 7.  ");
        assert_eq!(answer.final_answer_text, "The answer is 7.");
        assert_eq!(answer.submitted_answer, "The answer is 7.");
    }

    #[test]
    fn test_reasoning_trace_format() {
        let steps = vec!["Reasoning: a".to_string(), "Reasoning: b".to_string()];
        assert_eq!(
            format_reasoning_trace(&steps),
            "Step 1: Reasoning: a\nStep 2: Reasoning: b"
        );
        assert_eq!(format_reasoning_trace(&[]), "");
    }

    #[test]
    fn test_normalize_builds_result() {
        let state = RunState::new("What is 2+2?", "t1", None)
            .with_turn(ConversationTurn::assistant("I'll add. FINAL ANSWER: 4"))
            .with_reasoning_steps(vec!["Reasoning: add.".to_string()])
            .with_tools_used(["web_search"]);
        let finished_at = state.started_at + Duration::milliseconds(1500);

        let result = OutputNormalizer::default().normalize(state, 0.9, finished_at);
        assert_eq!(result.final_answer_text, "4");
        assert_eq!(result.task_id, "t1");
        assert_eq!(result.steps_taken, 1);
        assert_eq!(result.reasoning_trace, "Step 1: Reasoning: add.");
        assert_eq!(result.tools_used, vec!["web_search"]);
        assert_eq!(result.conversation.len(), 2);
        assert!((result.processing_time_seconds - 1.5).abs() < 1e-9);
        assert!(!result.is_error());
    }

    #[test]
    fn test_failed_result() {
        let result = RunResult::failed("r1", "t1", "model unavailable", Vec::new(), 2.0);
        assert_eq!(result.final_answer_text, "ERROR: model unavailable");
        assert_eq!(result.submitted_answer, "ERROR");
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.errors_encountered, 1);
        assert!(result.is_error());
    }
}
