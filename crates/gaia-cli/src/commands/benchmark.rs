use std::time::Duration;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use comfy_table::{Cell, Table};
use gaia_agent::{
    AiError, AnswerSubmission, BenchmarkClient, GaiaRunner, RunResult, SubmissionOutcome,
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::cli::BenchmarkArgs;
use crate::config::CliConfig;
use crate::output::table::{ellipsize, print_table};
use crate::output::{OutputFormat, json::print_json};
use crate::setup::{DEFAULT_AGENT_CODE, DEFAULT_RATE_LIMIT_SECS};

#[derive(Debug, Serialize)]
struct BenchmarkReport {
    results: Vec<RunResult>,
    average_seconds: f64,
    failed: usize,
    submission: Option<Value>,
}

pub async fn run(
    runner: &GaiaRunner,
    client: &BenchmarkClient,
    config: &CliConfig,
    args: BenchmarkArgs,
    format: OutputFormat,
) -> Result<()> {
    let username = args
        .username
        .clone()
        .or_else(|| config.benchmark.username.clone());
    if !args.no_submit && username.is_none() {
        bail!("A username is required to submit answers");
    }

    let mut questions = client.fetch_questions().await?;
    if let Some(limit) = args.limit.or(config.benchmark.max_questions) {
        questions.truncate(limit);
    }
    let pause = Duration::from_secs(
        config
            .benchmark
            .rate_limit_secs
            .unwrap_or(DEFAULT_RATE_LIMIT_SECS),
    );

    let total = questions.len();
    let mut results = Vec::with_capacity(total);
    for (i, question) in questions.iter().enumerate() {
        if i > 0 && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
        tracing::info!(task_id = %question.task_id, index = i + 1, total, "Solving question");
        let result = runner
            .solve(
                &question.question,
                &question.task_id,
                question.file_name.as_deref().unwrap_or_default(),
            )
            .await;
        if !format.is_json() {
            print_progress(i + 1, total, &result);
        }
        results.push(result);
    }

    let answers = submissions(&results);
    let submission = match (&username, args.no_submit) {
        (Some(username), false) => {
            let agent_code = config
                .benchmark
                .agent_code
                .as_deref()
                .unwrap_or(DEFAULT_AGENT_CODE);
            Some(client.submit_answers(&answers, username, agent_code).await)
        }
        _ => None,
    };

    // The report is printed before a transport failure is surfaced.
    let report = build_report(results, submission.as_ref());
    if format.is_json() {
        print_json(&report)?;
    } else {
        print_summary(&report)?;
        match &submission {
            Some(Ok(SubmissionOutcome::Accepted(body))) => {
                println!("\n{} {}", "Submitted:".green().bold(), body);
            }
            Some(Ok(SubmissionOutcome::Rejected { status, body })) => {
                println!("\n{} HTTP {status}: {body}", "Submission rejected:".red().bold());
            }
            Some(Err(_)) => {}
            None => println!("\nSubmission skipped."),
        }
    }

    match submission {
        Some(Err(e)) => Err(e).context("Submitting answers failed"),
        _ => Ok(()),
    }
}

fn build_report(
    results: Vec<RunResult>,
    submission: Option<&std::result::Result<SubmissionOutcome, AiError>>,
) -> BenchmarkReport {
    BenchmarkReport {
        average_seconds: average_seconds(&results),
        failed: results.iter().filter(|r| r.is_error()).count(),
        submission: submission.map(submission_to_json),
        results,
    }
}

fn submissions(results: &[RunResult]) -> Vec<AnswerSubmission> {
    results
        .iter()
        .map(|r| AnswerSubmission {
            task_id: r.task_id.clone(),
            submitted_answer: r.submitted_answer.clone(),
        })
        .collect()
}

fn average_seconds(results: &[RunResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    results.iter().map(|r| r.processing_time_seconds).sum::<f64>() / results.len() as f64
}

fn submission_to_json(submission: &std::result::Result<SubmissionOutcome, AiError>) -> Value {
    match submission {
        Ok(SubmissionOutcome::Accepted(body)) => json!({"accepted": true, "response": body}),
        Ok(SubmissionOutcome::Rejected { status, body }) => {
            json!({"accepted": false, "status": status, "response": body})
        }
        Err(e) => json!({"accepted": false, "error": e.to_string()}),
    }
}

fn print_progress(index: usize, total: usize, result: &RunResult) {
    let answer = if result.is_error() {
        result.final_answer_text.red()
    } else {
        result.submitted_answer.green()
    };
    println!(
        "[{index}/{total}] {} -> {answer} (confidence {:.2}, {:.1}s)",
        result.task_id, result.confidence, result.processing_time_seconds
    );
}

fn print_summary(report: &BenchmarkReport) -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Task ID", "Answer", "Confidence", "Tools", "Time (s)"]);
    for r in &report.results {
        table.add_row(vec![
            Cell::new(&r.task_id),
            Cell::new(ellipsize(&r.submitted_answer, 40)),
            Cell::new(format!("{:.2}", r.confidence)),
            Cell::new(r.tools_used.len()),
            Cell::new(format!("{:.1}", r.processing_time_seconds)),
        ]);
    }
    print_table(table)?;
    println!(
        "{} questions, {} failed, average {:.1}s per question",
        report.results.len(),
        report.failed,
        report.average_seconds
    );
    Ok(())
}
