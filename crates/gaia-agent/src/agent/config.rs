use std::time::Duration;

/// Default number of model calls allowed per question.
pub const DEFAULT_STEP_BUDGET: usize = 25;

/// Default maximum number of tool calls that run concurrently (1 = sequential).
pub const DEFAULT_MAX_TOOL_CONCURRENCY: usize = 1;

/// Configuration for one agent loop
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Template for the system prompt; `{system_time}` is substituted.
    /// `None` uses the built-in GAIA prompt.
    pub system_prompt: Option<String>,
    /// Maximum number of model calls (default: 25, minimum 1).
    pub step_budget: usize,
    pub temperature: Option<f32>,
    /// Optional maximum output tokens for each completion request.
    pub max_output_tokens: Option<u32>,
    /// Timeout for each tool execution (default: 120s).
    pub tool_timeout: Duration,
    /// Maximum number of tool calls that can execute concurrently (default: 1).
    pub max_tool_concurrency: usize,
    /// Max length for tool results fed back to the model (default: 8000)
    pub max_tool_result_length: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            step_budget: DEFAULT_STEP_BUDGET,
            temperature: None, // None = use model default
            max_output_tokens: None,
            tool_timeout: Duration::from_secs(120),
            max_tool_concurrency: DEFAULT_MAX_TOOL_CONCURRENCY,
            max_tool_result_length: 8000,
        }
    }
}

impl AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the step budget; values below 1 are clamped to 1.
    pub fn with_step_budget(mut self, budget: usize) -> Self {
        self.step_budget = budget.max(1);
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = Some(max);
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_max_tool_concurrency(mut self, max: usize) -> Self {
        self.max_tool_concurrency = max.max(1);
        self
    }

    pub fn with_max_tool_result_length(mut self, max: usize) -> Self {
        self.max_tool_result_length = max;
        self
    }

    /// Budget actually enforced by the loop.
    pub fn effective_step_budget(&self) -> usize {
        self.step_budget.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.step_budget, 25);
        assert_eq!(config.tool_timeout, Duration::from_secs(120));
        assert_eq!(config.max_tool_concurrency, 1);
        assert_eq!(config.max_tool_result_length, 8000);
    }

    #[test]
    fn test_step_budget_clamped() {
        assert_eq!(AgentConfig::new().with_step_budget(0).step_budget, 1);
        let raw = AgentConfig {
            step_budget: 0,
            ..AgentConfig::default()
        };
        assert_eq!(raw.effective_step_budget(), 1);
    }
}
