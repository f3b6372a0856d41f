//! Type-dispatching analysis of a downloaded attachment.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::Result;
use crate::tools::files::{ReadFileTool, detect_mime_type, is_text_like};
use crate::tools::spreadsheet::{is_spreadsheet, load_sheet_blocking};
use crate::tools::traits::{Tool, ToolOutput};
use crate::tools::vision::{AnalyzeImageTool, DESCRIBE_IMAGE_PROMPT};

#[derive(Debug, Deserialize)]
struct AnalyzeFileInput {
    file_path: String,
    query: Option<String>,
}

/// Routes a file to the spreadsheet, image or text reader by its type.
#[derive(Clone)]
pub struct AnalyzeFileTool {
    images: AnalyzeImageTool,
}

impl AnalyzeFileTool {
    pub fn new(images: AnalyzeImageTool) -> Self {
        Self { images }
    }
}

#[async_trait]
impl Tool for AnalyzeFileTool {
    fn name(&self) -> &str {
        "analyze_file"
    }

    fn description(&self) -> &str {
        "Analyze any downloaded file by its type: spreadsheets are summarised or \
         queried, images are described or questioned, text files are read."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path returned by download_gaia_file"
                },
                "query": {
                    "type": "string",
                    "description": "Optional question about the file"
                }
            },
            "required": ["file_path"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput> {
        let params: AnalyzeFileInput = serde_json::from_value(input)?;
        let path = Path::new(&params.file_path);
        let mime = detect_mime_type(path);
        let query = params.query.as_deref().filter(|q| !q.trim().is_empty());
        tracing::debug!(file_path = %params.file_path, mime, "Analyzing file");

        if is_spreadsheet(path) {
            let sheet = match load_sheet_blocking(path.to_path_buf(), None).await {
                Ok(sheet) => sheet,
                Err(e) => return Ok(ToolOutput::error(e.to_string())),
            };
            let text = match query {
                Some(query) => sheet.analyze(query),
                None => sheet.describe(),
            };
            return Ok(ToolOutput::success(Value::String(text)));
        }

        if mime.starts_with("image/") {
            return self
                .images
                .analyze(&params.file_path, query.unwrap_or(DESCRIBE_IMAGE_PROMPT))
                .await;
        }

        if is_text_like(mime) {
            return ReadFileTool::new()
                .execute(json!({ "path": params.file_path }))
                .await;
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&params.file_path);
        Ok(ToolOutput::error(format!(
            "No analyzer for {file_name} ({mime})"
        )))
    }
}
