//! Tools available to the agent

mod analyze_file;
mod files;
mod python;
mod registry;
mod spreadsheet;
mod tasks;
mod traits;
mod vision;
mod web_fetch;
mod web_search;

use std::path::PathBuf;

use crate::benchmark::BenchmarkClient;
use crate::llm::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL};

pub use analyze_file::AnalyzeFileTool;
pub use files::{DownloadGaiaFileTool, ReadFileTool, detect_mime_type};
pub use python::PythonReplTool;
pub use registry::ToolRegistry;
pub use spreadsheet::{
    AnalyzeSpreadsheetTool, CellValue, ColumnStats, ReadSpreadsheetTool, SheetData, load_sheet,
};
pub use tasks::{FetchGaiaTaskTool, ListGaiaTasksTool};
pub use traits::{SecretResolver, Tool, ToolOutput, ToolSchema, env_secret_resolver};
pub use vision::{AnalyzeImageTool, DescribeImageTool};
pub use web_fetch::ExtractTextTool;
pub use web_search::WebSearchTool;

/// Settings for the built-in tools.
#[derive(Debug, Clone)]
pub struct ToolSettings {
    /// Where task attachments are written
    pub download_dir: PathBuf,
    /// OpenAI-compatible endpoint used for image analysis
    pub vision_base_url: String,
    pub vision_model: String,
    pub python_path: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            vision_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            vision_model: DEFAULT_OPENAI_MODEL.to_string(),
            python_path: "python3".to_string(),
        }
    }
}

/// Registry with every built-in tool: search, page extraction, task lookup,
/// attachment download and analysis, and Python.
pub fn default_registry(benchmark: BenchmarkClient, settings: &ToolSettings) -> ToolRegistry {
    let images = AnalyzeImageTool::new()
        .with_base_url(settings.vision_base_url.clone())
        .with_model(settings.vision_model.clone());

    let mut registry = ToolRegistry::new();
    registry.register(WebSearchTool::new());
    registry.register(ExtractTextTool::new());
    registry.register(ListGaiaTasksTool::new(benchmark.clone()));
    registry.register(FetchGaiaTaskTool::new(benchmark.clone()));
    registry.register(DownloadGaiaFileTool::new(benchmark, settings.download_dir.clone()));
    registry.register(ReadFileTool::new());
    registry.register(ReadSpreadsheetTool::new());
    registry.register(AnalyzeSpreadsheetTool::new());
    registry.register(DescribeImageTool::new(images.clone()));
    registry.register(AnalyzeFileTool::new(images.clone()));
    registry.register(images);
    registry.register(PythonReplTool::with_python_path(settings.python_path.clone()));
    registry
}

/// Default attachment directory: the user cache dir, or the system temp dir.
pub fn default_download_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("gaia-agent")
        .join("files")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_tools() {
        let settings = ToolSettings {
            download_dir: std::env::temp_dir(),
            ..ToolSettings::default()
        };
        let registry = default_registry(BenchmarkClient::default(), &settings);
        assert_eq!(
            registry.list(),
            vec![
                "analyze_file",
                "analyze_image",
                "analyze_spreadsheet_data",
                "describe_image",
                "download_gaia_file",
                "extract_text_from_url",
                "fetch_gaia_task",
                "list_gaia_tasks",
                "python_repl",
                "read_file",
                "read_spreadsheet",
                "web_search"
            ]
        );
    }
}
