//! Rule-based confidence score for a finished run.

use crate::agent::output::contains_answer_marker;

const BASE: f64 = 0.5;
const MARKER_BONUS: f64 = 0.3;
const PER_TOOL: f64 = 0.1;
const MAX_TOOL_BONUS: f64 = 0.3;
const PER_STEP: f64 = 0.05;
const MAX_STEP_BONUS: f64 = 0.2;
const PER_ERROR: f64 = 0.1;

/// Score in `[0.0, 1.0]`: base 0.5, +0.3 for an answer marker, up to +0.3 for
/// distinct tools, up to +0.2 for reasoning steps, -0.1 per error.
pub fn estimate_confidence(
    final_text: &str,
    tools_used: &[String],
    reasoning_steps: &[String],
    error_count: u32,
) -> f64 {
    let mut score = BASE;
    if contains_answer_marker(final_text) {
        score += MARKER_BONUS;
    }
    score += (tools_used.len() as f64 * PER_TOOL).min(MAX_TOOL_BONUS);
    score += (reasoning_steps.len() as f64 * PER_STEP).min(MAX_STEP_BONUS);
    score -= f64::from(error_count) * PER_ERROR;
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize, prefix: &str) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    #[test]
    fn test_base_score() {
        assert_eq!(estimate_confidence("just text", &[], &[], 0), 0.5);
    }

    #[test]
    fn test_marker_only() {
        let score = estimate_confidence("FINAL ANSWER: 4", &[], &[], 0);
        assert!((score - 0.8).abs() < 1e-9);
        let lower = estimate_confidence("final answer: 4", &[], &[], 0);
        assert!((lower - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_saturates_at_one() {
        let score = estimate_confidence("FINAL ANSWER: x", &names(3, "tool"), &names(5, "step"), 0);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_bonuses_are_capped() {
        let score = estimate_confidence("no marker", &names(10, "tool"), &names(1, "step"), 0);
        assert!((score - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_errors_never_go_below_zero() {
        assert_eq!(estimate_confidence("text", &[], &[], 50), 0.0);
        let score = estimate_confidence("FINAL ANSWER: 1", &[], &[], 1);
        assert!((score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_always_in_range() {
        for tools in 0..6 {
            for steps in 0..8 {
                for errors in 0..15 {
                    for text in ["FINAL ANSWER: y", "nothing"] {
                        let score =
                            estimate_confidence(text, &names(tools, "t"), &names(steps, "s"), errors);
                        assert!((0.0..=1.0).contains(&score));
                    }
                }
            }
        }
    }
}
