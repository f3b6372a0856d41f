use anyhow::Result;
use comfy_table::{Cell, Table};
use gaia_agent::BenchmarkClient;

use crate::output::table::{ellipsize, print_table};
use crate::output::{OutputFormat, json::print_json};

pub async fn run(client: &BenchmarkClient, limit: Option<usize>, format: OutputFormat) -> Result<()> {
    let mut questions = client.fetch_questions().await?;
    if let Some(limit) = limit {
        questions.truncate(limit);
    }

    if format.is_json() {
        return print_json(&questions);
    }

    let mut table = Table::new();
    table.set_header(vec!["Task ID", "Level", "File", "Question"]);
    for q in &questions {
        table.add_row(vec![
            Cell::new(&q.task_id),
            Cell::new(q.level.map_or_else(|| "-".to_string(), |l| l.to_string())),
            Cell::new(q.file_name.as_deref().unwrap_or("-")),
            Cell::new(ellipsize(&q.question, 80)),
        ]);
    }
    print_table(table)
}
