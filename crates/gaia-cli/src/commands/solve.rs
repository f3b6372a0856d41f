use anyhow::Result;
use colored::Colorize;
use gaia_agent::{GaiaRunner, RunResult};

use crate::cli::SolveArgs;
use crate::output::{OutputFormat, json::print_json};

pub async fn run(runner: &GaiaRunner, args: SolveArgs, format: OutputFormat) -> Result<()> {
    let result = runner
        .solve(&args.question, &args.task_id, &args.file_name)
        .await;

    if format.is_json() {
        return print_json(&result);
    }
    print_result(&result);
    Ok(())
}

pub fn print_result(result: &RunResult) {
    let answer = if result.is_error() {
        result.final_answer_text.red().bold()
    } else {
        result.submitted_answer.green().bold()
    };
    println!("Answer:      {answer}");
    println!("Confidence:  {:.2}", result.confidence);
    println!(
        "Tools:       {}",
        if result.tools_used.is_empty() {
            "-".to_string()
        } else {
            result.tools_used.join(", ")
        }
    );
    println!("Time:        {:.1}s", result.processing_time_seconds);
    println!("Errors:      {}", result.errors_encountered);

    if !result.reasoning_trace.is_empty() {
        println!("\n{}\n{}", "Reasoning:".bold(), result.reasoning_trace);
    }
}
