//! CLI configuration file support
//!
//! Loads configuration from ~/.config/gaia-agent/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub api_keys: ApiKeysConfig,
    #[serde(default)]
    pub benchmark: BenchmarkConfig,
    #[serde(default)]
    pub agent: AgentSection,
}

/// Turn generator settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: Option<String>,
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
}

/// API key configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeysConfig {
    /// OpenAI (or compatible) API key
    pub openai: Option<String>,
    /// Tavily search API key
    pub tavily: Option<String>,
}

/// Scoring service settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub agent_code: Option<String>,
    /// Pause between questions (default: 5s)
    pub rate_limit_secs: Option<u64>,
    pub max_questions: Option<usize>,
}

/// Agent loop settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentSection {
    pub step_budget: Option<usize>,
    pub question_timeout_secs: Option<u64>,
    pub tool_timeout_secs: Option<u64>,
    pub max_tool_concurrency: Option<usize>,
    pub download_dir: Option<PathBuf>,
}

impl CliConfig {
    /// Load configuration from default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Get the default configuration file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gaia-agent").join("config.toml"))
    }

    /// Apply API keys to environment variables that are not already set
    ///
    /// Must run before the tokio runtime and the log writer thread exist;
    /// `main` calls it first and only then builds the runtime.
    pub fn apply_api_key_env(&self) {
        let pairs = [
            ("OPENAI_API_KEY", &self.api_keys.openai),
            ("TAVILY_API_KEY", &self.api_keys.tavily),
        ];
        for (var, value) in pairs {
            if let Some(key) = value
                && std::env::var(var).is_err()
            {
                // SAFETY: the process is still single-threaded, see `main`
                unsafe { std::env::set_var(var, key) };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = CliConfig::load_from_path(Some(PathBuf::from("/nonexistent/gaia.toml")));
        assert!(config.model.name.is_none());
        assert!(config.benchmark.username.is_none());
    }

    #[test]
    fn test_parse_all_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[model]
name = "gpt-4o-mini"
temperature = 0.0

[api_keys]
tavily = "tvly-123"

[benchmark]
username = "alice"
rate_limit_secs = 2

[agent]
step_budget = 12
question_timeout_secs = 300
download_dir = "/tmp/gaia-files"
"#
        )
        .unwrap();

        let config = CliConfig::load_from_path(Some(file.path().to_path_buf()));
        assert_eq!(config.model.name.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(config.model.temperature, Some(0.0));
        assert_eq!(config.api_keys.tavily.as_deref(), Some("tvly-123"));
        assert_eq!(config.benchmark.username.as_deref(), Some("alice"));
        assert_eq!(config.benchmark.rate_limit_secs, Some(2));
        assert_eq!(config.agent.step_budget, Some(12));
        assert_eq!(config.agent.question_timeout_secs, Some(300));
        assert_eq!(
            config.agent.download_dir,
            Some(PathBuf::from("/tmp/gaia-files"))
        );
    }

    #[test]
    fn test_invalid_toml_yields_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is [not toml").unwrap();
        let config = CliConfig::load_from_path(Some(file.path().to_path_buf()));
        assert!(config.agent.step_budget.is_none());
    }
}
