use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use gaia_agent::agent::{AgentConfig, AgentLoop, GaiaRunner, RunnerConfig};
use gaia_agent::llm::{DEFAULT_OPENAI_MODEL, LlmClient, MockLlmClient, MockStep, OpenAIClient};
use gaia_agent::{BenchmarkClient, DEFAULT_BENCHMARK_URL, ToolSettings, default_registry};

use crate::cli::Cli;
use crate::config::CliConfig;

pub const DEFAULT_AGENT_CODE: &str = "gaia-agent";
pub const DEFAULT_RATE_LIMIT_SECS: u64 = 5;

pub fn benchmark_client(config: &CliConfig) -> BenchmarkClient {
    BenchmarkClient::new(
        config
            .benchmark
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BENCHMARK_URL),
    )
}

fn build_llm(cli: &Cli, config: &CliConfig) -> Result<Arc<dyn LlmClient>> {
    if cli.dry_run {
        return Ok(Arc::new(MockLlmClient::repeating(
            "dry-run",
            MockStep::text("Let me answer without tools. FINAL ANSWER: dry-run"),
        )));
    }

    let Ok(api_key) = std::env::var("OPENAI_API_KEY") else {
        bail!("OpenAI API key not found (set OPENAI_API_KEY or [api_keys].openai)");
    };
    let model = cli
        .model
        .clone()
        .or_else(|| config.model.name.clone())
        .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());

    let mut client = OpenAIClient::new(api_key).with_model(model);
    if let Some(url) = cli.base_url.as_ref().or(config.model.base_url.as_ref()) {
        client = client.with_base_url(url.clone());
    }
    Ok(Arc::new(client))
}

pub fn agent_config(cli: &Cli, config: &CliConfig) -> AgentConfig {
    let mut agent = AgentConfig::new();
    if let Some(budget) = cli.step_budget.or(config.agent.step_budget) {
        agent = agent.with_step_budget(budget);
    }
    if let Some(temperature) = config.model.temperature {
        agent = agent.with_temperature(temperature);
    }
    if let Some(secs) = config.agent.tool_timeout_secs {
        agent = agent.with_tool_timeout(Duration::from_secs(secs));
    }
    if let Some(max) = config.agent.max_tool_concurrency {
        agent = agent.with_max_tool_concurrency(max);
    }
    agent
}

pub fn tool_settings(cli: &Cli, config: &CliConfig) -> ToolSettings {
    let mut settings = ToolSettings::default();
    if let Some(dir) = &config.agent.download_dir {
        settings.download_dir = dir.clone();
    }
    if let Some(url) = cli.base_url.as_ref().or(config.model.base_url.as_ref()) {
        settings.vision_base_url = url.clone();
    }
    settings
}

/// Runner with the built-in tools, configured from flags and the config file.
pub fn build_runner(cli: &Cli, config: &CliConfig) -> Result<GaiaRunner> {
    let llm = build_llm(cli, config)?;
    let tools = default_registry(benchmark_client(config), &tool_settings(cli, config));

    let mut runner_config = RunnerConfig::default();
    if let Some(secs) = config.agent.question_timeout_secs {
        runner_config = runner_config.with_question_timeout(Duration::from_secs(secs));
    }

    let agent = AgentLoop::new(llm, Arc::new(tools), agent_config(cli, config));
    Ok(GaiaRunner::new(agent).with_config(runner_config))
}
