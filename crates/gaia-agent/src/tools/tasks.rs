//! Benchmark task lookup tools backed by the scoring service.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::benchmark::{BenchmarkClient, BenchmarkQuestion};
use crate::error::Result;
use crate::text_utils::take_chars;
use crate::tools::traits::{Tool, ToolOutput};

const DEFAULT_LIST_LIMIT: usize = 10;
const PREVIEW_CHARS: usize = 100;

/// Level filter given either as a number or a string ("2").
fn parse_level(value: &Value) -> Option<u8> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| u8::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn format_listing(questions: &[BenchmarkQuestion]) -> String {
    let mut lines = vec![format!("=== GAIA TASKS (first {}) ===", questions.len())];
    for (i, task) in questions.iter().enumerate() {
        let marker = if task.has_file() { "[file]" } else { "[text]" };
        let level = task
            .level
            .map(|l| l.to_string())
            .unwrap_or_else(|| "?".to_string());
        lines.push(format!("{}. {marker} Level {level} - {}", i + 1, task.task_id));

        let preview = take_chars(&task.question, PREVIEW_CHARS);
        let ellipsis = if preview.len() < task.question.len() { "..." } else { "" };
        lines.push(format!("   {preview}{ellipsis}"));
        if let Some(file_name) = &task.file_name {
            lines.push(format!("   File: {file_name}"));
        }
        lines.push(String::new());
    }
    lines.push("Use fetch_gaia_task with a task_id to load one task.".to_string());
    lines.join("\n")
}

fn format_task(task: &BenchmarkQuestion) -> String {
    let mut lines = vec![
        "=== GAIA TASK ===".to_string(),
        format!("Task ID: {}", task.task_id),
    ];
    if let Some(level) = task.level {
        lines.push(format!("Level: {level}"));
    }
    lines.push(format!("Question: {}", task.question));
    match &task.file_name {
        Some(file_name) => {
            lines.push(format!("\nAttached file: {file_name}"));
            lines.push("Use download_gaia_file with this task_id to fetch it.".to_string());
        }
        None => lines.push("\nNo attached file.".to_string()),
    }
    lines.join("\n")
}

#[derive(Debug, Deserialize)]
struct ListTasksInput {
    #[serde(default)]
    level: Option<Value>,
    limit: Option<usize>,
}

/// Lists benchmark tasks, optionally filtered by level.
pub struct ListGaiaTasksTool {
    client: BenchmarkClient,
}

impl ListGaiaTasksTool {
    pub fn new(client: BenchmarkClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ListGaiaTasksTool {
    fn name(&self) -> &str {
        "list_gaia_tasks"
    }

    fn description(&self) -> &str {
        "List GAIA benchmark tasks with their level, id, a question preview and any \
         attached file name."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "level": {
                    "type": "string",
                    "description": "Only list tasks of this level (1, 2 or 3)"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of tasks (default: 10)"
                }
            }
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput> {
        let params: ListTasksInput = serde_json::from_value(input)?;
        let mut questions = match self.client.fetch_questions().await {
            Ok(questions) => questions,
            Err(e) => return Ok(ToolOutput::error(format!("Could not fetch tasks: {e}"))),
        };

        if let Some(level) = params.level.as_ref().filter(|v| !v.is_null()) {
            let Some(level) = parse_level(level) else {
                return Ok(ToolOutput::error(format!("Invalid level: {level}")));
            };
            questions.retain(|q| q.level == Some(level));
        }
        questions.truncate(params.limit.unwrap_or(DEFAULT_LIST_LIMIT));

        Ok(ToolOutput::success(Value::String(format_listing(&questions))))
    }
}

#[derive(Debug, Deserialize)]
struct FetchTaskInput {
    task_id: String,
}

/// Loads one benchmark task by id.
pub struct FetchGaiaTaskTool {
    client: BenchmarkClient,
}

impl FetchGaiaTaskTool {
    pub fn new(client: BenchmarkClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for FetchGaiaTaskTool {
    fn name(&self) -> &str {
        "fetch_gaia_task"
    }

    fn description(&self) -> &str {
        "Fetch one GAIA task by id: its level, full question and attached file name."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "string",
                    "description": "Task id to fetch"
                }
            },
            "required": ["task_id"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput> {
        let params: FetchTaskInput = serde_json::from_value(input)?;
        let questions = match self.client.fetch_questions().await {
            Ok(questions) => questions,
            Err(e) => return Ok(ToolOutput::error(format!("Could not fetch tasks: {e}"))),
        };

        match questions.iter().find(|q| q.task_id == params.task_id.trim()) {
            Some(task) => Ok(ToolOutput::success(Value::String(format_task(task)))),
            None => Ok(ToolOutput::error(format!(
                "Task {} not found",
                params.task_id
            ))),
        }
    }
}
