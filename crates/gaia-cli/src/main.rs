mod cli;
mod commands;
mod completions;
mod config;
mod error;
mod output;
mod setup;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tokio::runtime::Runtime;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    let config = config::CliConfig::load();
    // Still single-threaded: no runtime workers or log writer yet.
    config.apply_api_key_env();

    let _guard = init_logging(cli.verbose);

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(err) => error::handle_error(err),
    };
    if let Err(err) = runtime.block_on(run(cli, config)) {
        error::handle_error(err);
    }
}

fn build_runtime() -> Result<Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

async fn run(cli: Cli, config: config::CliConfig) -> Result<()> {
    let format = cli.format;
    match &cli.command {
        Commands::Completions { shell } => {
            completions::generate_completions(*shell);
            Ok(())
        }
        Commands::Questions { limit } => {
            let client = setup::benchmark_client(&config);
            commands::questions::run(&client, *limit, format).await
        }
        Commands::Solve(args) => {
            let runner = setup::build_runner(&cli, &config)?;
            commands::solve::run(&runner, args.clone(), format).await
        }
        Commands::Benchmark(args) => {
            let runner = setup::build_runner(&cli, &config)?;
            let client = setup::benchmark_client(&config);
            commands::benchmark::run(&runner, &client, &config, args.clone(), format).await
        }
    }
}

fn log_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("gaia-agent")
        .join("logs")
}

/// Log to a daily-rolling file; `RUST_LOG` overrides the default level.
fn init_logging(verbose: bool) -> WorkerGuard {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(log_dir, "gaia.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .init();

    guard
}
