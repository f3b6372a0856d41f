//! Task attachment tools: download from the scoring service and read back.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::benchmark::BenchmarkClient;
use crate::error::Result;
use crate::text_utils::truncate_with_marker;
use crate::tools::traits::{Tool, ToolOutput};

const MAX_READ_LENGTH: usize = 20_000;

/// MIME type guessed from the file extension.
pub fn detect_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xls" => "application/vnd.ms-excel",
        "csv" => "text/csv",
        "txt" | "md" => "text/plain",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "doc" => "application/msword",
        "ppt" => "application/vnd.ms-powerpoint",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "json" | "jsonld" => "application/json",
        "xml" => "application/xml",
        "py" => "text/x-python",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

pub(crate) fn is_text_like(mime: &str) -> bool {
    mime.starts_with("text/") || matches!(mime, "application/json" | "application/xml")
}

/// Keep only the final path component so a hostile header cannot escape the download dir.
fn sanitize_file_name(name: &str) -> Option<String> {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .filter(|n| !n.is_empty() && n != "." && n != "..")
}

#[derive(Debug, Deserialize)]
struct DownloadInput {
    task_id: String,
}

/// Fetches the attachment of a benchmark task into a local directory.
pub struct DownloadGaiaFileTool {
    client: BenchmarkClient,
    download_dir: PathBuf,
}

impl DownloadGaiaFileTool {
    pub fn new(client: BenchmarkClient, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            download_dir: download_dir.into(),
        }
    }
}

#[async_trait]
impl Tool for DownloadGaiaFileTool {
    fn name(&self) -> &str {
        "download_gaia_file"
    }

    fn description(&self) -> &str {
        "Download the file attached to a GAIA task. Returns the local path, size and \
         detected MIME type. Call this before analysing any attached file."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "string",
                    "description": "The task id the file belongs to"
                }
            },
            "required": ["task_id"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput> {
        let params: DownloadInput = serde_json::from_value(input)?;
        let task_id = params.task_id.trim();
        if task_id.is_empty() {
            return Ok(ToolOutput::error("task_id must not be empty"));
        }

        let file = match self.client.download_file(task_id).await {
            Ok(file) => file,
            Err(e) => return Ok(ToolOutput::error(format!("Download failed: {e}"))),
        };

        let file_name = file
            .file_name
            .as_deref()
            .and_then(sanitize_file_name)
            .unwrap_or_else(|| format!("{task_id}_file"));
        let task_dir = self
            .download_dir
            .join(sanitize_file_name(task_id).unwrap_or_else(|| "task".to_string()));
        tokio::fs::create_dir_all(&task_dir).await?;
        let path = task_dir.join(&file_name);
        tokio::fs::write(&path, &file.bytes).await?;

        tracing::debug!(task_id, path = %path.display(), bytes = file.bytes.len(), "Downloaded task file");
        Ok(ToolOutput::success(json!({
            "path": path.display().to_string(),
            "file_name": file_name,
            "size_bytes": file.bytes.len(),
            "mime_type": detect_mime_type(&path),
        })))
    }
}

#[derive(Debug, Deserialize)]
struct ReadFileInput {
    path: String,
}

/// Reads a local text-like file, e.g. one fetched by `download_gaia_file`.
pub struct ReadFileTool {
    max_length: usize,
}

impl Default for ReadFileTool {
    fn default() -> Self {
        Self {
            max_length: MAX_READ_LENGTH,
        }
    }
}

impl ReadFileTool {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a local text file (txt, csv, json, xml, py, md). Binary formats are \
         reported with their MIME type instead of content."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path returned by download_gaia_file"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput> {
        let params: ReadFileInput = serde_json::from_value(input)?;
        let path = PathBuf::from(&params.path);
        let mime = detect_mime_type(&path);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => return Ok(ToolOutput::error(format!("Cannot read {}: {e}", params.path))),
        };

        if !is_text_like(mime) {
            return Ok(ToolOutput::error(format!(
                "{} is {mime} ({} bytes); only text formats can be read, use analyze_file \
                 for spreadsheets and images",
                params.path,
                bytes.len()
            )));
        }

        let text = String::from_utf8_lossy(&bytes);
        Ok(ToolOutput::success(Value::String(truncate_with_marker(
            &text,
            self.max_length,
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_detect_mime_type() {
        assert_eq!(detect_mime_type(Path::new("a/b.CSV")), "text/csv");
        assert_eq!(detect_mime_type(Path::new("x.mp3")), "audio/mpeg");
        assert_eq!(detect_mime_type(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_file_name("data.xlsx").as_deref(), Some("data.xlsx"));
        assert_eq!(sanitize_file_name(".."), None);
    }

    #[tokio::test]
    async fn test_download_then_read() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/task-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-disposition", r#"attachment; filename="notes.txt""#)
                    .set_body_string("the answer is 42"),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let download = DownloadGaiaFileTool::new(BenchmarkClient::new(server.uri()), dir.path());
        let output = download
            .execute(json!({"task_id": "task-1"}))
            .await
            .unwrap();
        assert!(output.success);
        assert_eq!(output.result["mime_type"], "text/plain");
        assert_eq!(output.result["size_bytes"], 16);

        let path = output.result["path"].as_str().unwrap().to_string();
        let read = ReadFileTool::new()
            .execute(json!({ "path": path }))
            .await
            .unwrap();
        assert_eq!(read.render(), "the answer is 42");
    }

    #[tokio::test]
    async fn test_download_missing_file_is_error_output() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let download = DownloadGaiaFileTool::new(BenchmarkClient::new(server.uri()), dir.path());

        let output = download
            .execute(json!({"task_id": "nope"}))
            .await
            .unwrap();
        assert!(!output.success);
        assert!(output.render().contains("Download failed"));
    }

    #[tokio::test]
    async fn test_read_binary_file_reports_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp3");
        tokio::fs::write(&path, [0u8, 1, 2]).await.unwrap();

        let output = ReadFileTool::new()
            .execute(json!({ "path": path.display().to_string() }))
            .await
            .unwrap();
        assert!(!output.success);
        assert!(output.render().contains("audio/mpeg"));
    }
}
