//! System prompt and question decoration

use chrono::{DateTime, Utc};

use crate::agent::state::RunState;

/// Built-in system prompt; `{system_time}` is replaced at every model call.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a general AI assistant specialized in solving GAIA benchmark tasks.

=== GAIA RESPONSE FORMAT ===
CRITICAL: Always end your response with: FINAL ANSWER: [YOUR FINAL ANSWER]

Your FINAL ANSWER should be:
- A number (don't use commas or units like $ or % unless specified otherwise)
- As few words as possible (don't use articles or abbreviations unless specified)
- A comma-separated list of numbers/strings (apply above rules for each element)
- For strings: write digits in plain text unless specified otherwise
- For cities: use full names without abbreviations

=== AUTONOMY REQUIREMENTS ===
Work independently:
- NEVER ask the user for guidance, clarification, or additional information
- Always provide a FINAL ANSWER based on your best analysis
- Make reasonable connections and inferences from available information

=== REASONING STRATEGY ===
1. Analyze the question: extract every key detail (sections, dates, authors) and the expected answer type.
2. Research systematically: start with specific searches using the exact terms of the question, then broaden.
3. Read sources: when you find promising URLs, use extract_text_from_url and read the content carefully.
4. Verify: check that the answer matches what was asked and follows the format rules.

=== TOOL USAGE ===
- web_search finds pages; extract_text_from_url reads them
- download_gaia_file fetches a task attachment; analyze_file inspects it by type
- read_spreadsheet / analyze_spreadsheet_data for xlsx and csv, analyze_image / describe_image for pictures, read_file for text
- python_repl for calculations: print the result or assign it to `result`
- State your plan before calling tools ("I need to ...", "Let me ...")

System time: {system_time}"#;

/// Substitute the current time into a prompt template.
pub fn render_system_prompt(template: &str, now: DateTime<Utc>) -> String {
    template.replace("{system_time}", &now.to_rfc3339())
}

/// Task metadata appended to the system prompt when a task id is known.
pub fn context_block(state: &RunState) -> Option<String> {
    if state.task_id.is_empty() {
        return None;
    }
    Some(format!(
        "\n\n=== CURRENT TASK CONTEXT ===\nTask ID: {}\nHas File: {}\nTools Used: {}\nCurrent Step: {}\n",
        state.task_id,
        state.has_file(),
        state.tools_used.join(", "),
        state.current_phase,
    ))
}

/// Full system prompt for the next model call.
pub fn build_system_prompt(template: &str, state: &RunState, now: DateTime<Utc>) -> String {
    let mut prompt = render_system_prompt(template, now);
    if let Some(block) = context_block(state) {
        prompt.push_str(&block);
    }
    prompt
}

/// Question text with an attachment instruction block when a file is attached.
pub fn decorate_question(question: &str, task_id: &str, attached_file_name: Option<&str>) -> String {
    match attached_file_name.filter(|name| !name.trim().is_empty()) {
        Some(file_name) => format!(
            "{question}\n\n=== ATTACHED FILE ===\nFile: {file_name}\nTask ID: {task_id}\n\
             Use download_gaia_file with task_id '{task_id}' to retrieve this file before analysing it.\n"
        ),
        None => question.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::state::RunPhase;

    #[test]
    fn test_render_substitutes_time() {
        let now = Utc::now();
        let prompt = render_system_prompt(DEFAULT_SYSTEM_PROMPT, now);
        assert!(!prompt.contains("{system_time}"));
        assert!(prompt.contains(&now.to_rfc3339()));
    }

    #[test]
    fn test_no_context_without_task_id() {
        let state = RunState::new("q", "", None);
        assert_eq!(context_block(&state), None);
    }

    #[test]
    fn test_context_block_lists_metadata() {
        let state = RunState::new("q", "task-7", Some("a.xlsx".to_string()))
            .with_tools_used(["download_gaia_file", "read_file"])
            .with_phase(RunPhase::UsingTools(2));
        let block = context_block(&state).unwrap();
        assert!(block.contains("Task ID: task-7\n"));
        assert!(block.contains("Has File: true\n"));
        assert!(block.contains("Tools Used: download_gaia_file, read_file\n"));
        assert!(block.contains("Current Step: using_tools(2)\n"));
    }

    #[test]
    fn test_decorate_question() {
        assert_eq!(decorate_question("Q?", "t1", None), "Q?");
        assert_eq!(decorate_question("Q?", "t1", Some("")), "Q?");

        let decorated = decorate_question("Q?", "t1", Some("data.csv"));
        assert!(decorated.starts_with("Q?\n\n=== ATTACHED FILE ===\n"));
        assert!(decorated.contains("File: data.csv\n"));
        assert!(decorated.contains("download_gaia_file"));
    }
}
