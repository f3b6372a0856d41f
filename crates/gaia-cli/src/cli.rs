use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "gaia")]
#[command(version, about = "GAIA Agent - autonomous benchmark question answering")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Model name (defaults to gpt-4o)
    #[arg(long, global = true, env = "GAIA_MODEL")]
    pub model: Option<String>,

    /// OpenAI-compatible API base URL
    #[arg(long, global = true, env = "OPENAI_BASE_URL")]
    pub base_url: Option<String>,

    /// Maximum model calls per question
    #[arg(long, global = true)]
    pub step_budget: Option<usize>,

    /// Use a scripted offline model instead of a real one
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Solve a single question
    Solve(SolveArgs),

    /// List benchmark questions
    Questions {
        /// Show at most this many questions
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Solve benchmark questions and submit the answers
    Benchmark(BenchmarkArgs),

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Clone)]
pub struct SolveArgs {
    /// Question text
    pub question: String,

    /// Benchmark task id (enables the task context block)
    #[arg(long, default_value = "")]
    pub task_id: String,

    /// Name of the file attached to the task
    #[arg(long, default_value = "")]
    pub file_name: String,
}

#[derive(Args, Clone)]
pub struct BenchmarkArgs {
    /// Solve at most this many questions
    #[arg(long)]
    pub limit: Option<usize>,

    /// Username for the submission
    #[arg(long, env = "GAIA_USERNAME")]
    pub username: Option<String>,

    /// Solve only, do not submit
    #[arg(long)]
    pub no_submit: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "gaia",
            "solve",
            "What is 2+2?",
            "--task-id",
            "t1",
            "--dry-run",
            "--step-budget",
            "3",
            "--format",
            "json",
        ])
        .unwrap();
        assert!(cli.dry_run);
        assert_eq!(cli.step_budget, Some(3));
        assert!(cli.format.is_json());
        let Commands::Solve(args) = cli.command else {
            panic!("expected solve");
        };
        assert_eq!(args.question, "What is 2+2?");
        assert_eq!(args.task_id, "t1");
        assert_eq!(args.file_name, "");
    }

    #[test]
    fn test_parse_benchmark() {
        let cli = Cli::try_parse_from(["gaia", "benchmark", "--limit", "2", "--no-submit"]).unwrap();
        let Commands::Benchmark(args) = cli.command else {
            panic!("expected benchmark");
        };
        assert_eq!(args.limit, Some(2));
        assert!(args.no_submit);
    }
}
