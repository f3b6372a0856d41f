//! Spreadsheet attachments: CSV through `csv`, workbooks through `calamine`.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use calamine::{Data, Reader, open_workbook_auto};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{AiError, Result};
use crate::tools::files::detect_mime_type;
use crate::tools::traits::{Tool, ToolOutput};

const HEAD_ROWS: usize = 5;
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Whether the file is a table this module can load.
pub fn is_spreadsheet(path: &Path) -> bool {
    let ext = extension(path);
    ext == "csv" || WORKBOOK_EXTENSIONS.contains(&ext.as_str())
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// One cell, typed the way a data frame would infer it.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Bool(bool),
    Text(String),
}

impl CellValue {
    /// Infer a typed value from raw CSV text.
    pub fn parse(raw: &str) -> Self {
        let text = raw.trim();
        if text.is_empty() {
            return Self::Empty;
        }
        if let Ok(n) = text.parse::<f64>()
            && n.is_finite()
        {
            return Self::Number(n);
        }
        match text.to_ascii_lowercase().as_str() {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => Self::Text(text.to_string()),
        }
    }

    fn from_data(cell: &Data) -> Self {
        match cell {
            Data::Empty => Self::Empty,
            Data::Int(i) => Self::Number(*i as f64),
            Data::Float(f) => Self::Number(*f),
            Data::Bool(b) => Self::Bool(*b),
            Data::String(s) if s.trim().is_empty() => Self::Empty,
            Data::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Number(n) => write!(f, "{}", tidy(*n)),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Drop float noise such as `0.30000000000000004`.
fn tidy(n: f64) -> f64 {
    (n * 1e10).round() / 1e10
}

/// Summary statistics of a numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl fmt::Display for ColumnStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "count {}, sum {}, mean {}, min {}, max {}",
            self.count,
            tidy(self.sum),
            tidy(self.mean),
            tidy(self.min),
            tidy(self.max)
        )
    }
}

/// A loaded sheet: header row plus typed data rows.
#[derive(Debug, Clone)]
pub struct SheetData {
    pub file_name: String,
    /// Every sheet of a workbook; empty for CSV
    pub sheet_names: Vec<String>,
    pub sheet: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetData {
    fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&CellValue::Empty)
    }

    fn column_cells(&self, col: usize) -> impl Iterator<Item = &CellValue> {
        (0..self.rows.len()).map(move |row| self.cell(row, col))
    }

    /// `number`, `bool`, `text`, `mixed` or `empty`.
    pub fn column_type(&self, col: usize) -> &'static str {
        let mut kind = None;
        for cell in self.column_cells(col) {
            let this = match cell {
                CellValue::Empty => continue,
                CellValue::Number(_) => "number",
                CellValue::Bool(_) => "bool",
                CellValue::Text(_) => "text",
            };
            match kind {
                None => kind = Some(this),
                Some(seen) if seen != this => return "mixed",
                _ => {}
            }
        }
        kind.unwrap_or("empty")
    }

    /// Stats for a column whose non-empty cells are all numbers.
    pub fn numeric_stats(&self, col: usize) -> Option<ColumnStats> {
        if self.column_type(col) != "number" {
            return None;
        }
        let values: Vec<f64> = self.column_cells(col).filter_map(CellValue::as_number).collect();
        let count = values.len();
        let sum: f64 = values.iter().sum();
        Some(ColumnStats {
            count,
            sum,
            mean: sum / count as f64,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }

    pub fn missing_counts(&self) -> Vec<(&str, usize)> {
        self.columns
            .iter()
            .enumerate()
            .map(|(col, name)| {
                let missing = self
                    .column_cells(col)
                    .filter(|c| **c == CellValue::Empty)
                    .count();
                (name.as_str(), missing)
            })
            .filter(|(_, missing)| *missing > 0)
            .collect()
    }

    fn numeric_columns(&self) -> Vec<(usize, ColumnStats)> {
        (0..self.columns.len())
            .filter_map(|col| self.numeric_stats(col).map(|stats| (col, stats)))
            .collect()
    }

    fn shape_line(&self) -> String {
        format!(
            "Shape: {} rows x {} columns",
            self.rows.len(),
            self.columns.len()
        )
    }

    fn header_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("File: {}", self.file_name)];
        if !self.sheet_names.is_empty() {
            lines.push(format!("Sheets: {}", self.sheet_names.join(", ")));
        }
        if let Some(sheet) = &self.sheet {
            lines.push(format!("Reading sheet: {sheet}"));
        }
        lines.push(self.shape_line());
        lines.push(format!("Columns: {}", self.columns.join(", ")));
        lines
    }

    /// Structure overview: shape, column types, head rows, numeric stats
    /// and missing values.
    pub fn describe(&self) -> String {
        let mut lines = self.header_lines();
        let types: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(col, name)| format!("{name}: {}", self.column_type(col)))
            .collect();
        lines.push(format!("Column types: {}", types.join(", ")));

        lines.push(String::new());
        lines.push(format!("First {} rows:", HEAD_ROWS.min(self.rows.len())));
        lines.push(self.columns.join(" | "));
        for row in self.rows.iter().take(HEAD_ROWS) {
            let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
            lines.push(cells.join(" | "));
        }

        let numeric = self.numeric_columns();
        if !numeric.is_empty() {
            lines.push(String::new());
            lines.push("Numeric columns:".to_string());
            for (col, stats) in numeric {
                lines.push(format!("{}: {stats}", self.columns[col]));
            }
        }

        let missing = self.missing_counts();
        if !missing.is_empty() {
            let parts: Vec<String> = missing.iter().map(|(name, n)| format!("{name}: {n}")).collect();
            lines.push(String::new());
            lines.push(format!("Missing values: {}", parts.join(", ")));
        }
        lines.join("\n")
    }

    /// Answer common aggregate questions (sum, mean, count, min/max).
    /// Columns named in the query narrow the numeric output.
    pub fn analyze(&self, query: &str) -> String {
        let lower = query.to_lowercase();
        let wants = |words: &[&str]| words.iter().any(|w| lower.contains(w));

        let mut numeric = self.numeric_columns();
        let named: Vec<_> = numeric
            .iter()
            .filter(|(col, _)| lower.contains(&self.columns[*col].to_lowercase()))
            .cloned()
            .collect();
        if !named.is_empty() {
            numeric = named;
        }

        let mut lines = self.header_lines();
        lines.push(format!("Query: {query}"));
        let mut answered = false;

        if wants(&["sum", "total"]) {
            answered = true;
            lines.push(String::new());
            lines.push("Sums:".to_string());
            for (col, stats) in &numeric {
                lines.push(format!("{}: {}", self.columns[*col], tidy(stats.sum)));
            }
        }
        if wants(&["average", "mean"]) {
            answered = true;
            lines.push(String::new());
            lines.push("Means:".to_string());
            for (col, stats) in &numeric {
                lines.push(format!("{}: {}", self.columns[*col], tidy(stats.mean)));
            }
        }
        if wants(&["count", "how many", "number of"]) {
            answered = true;
            lines.push(String::new());
            lines.push(format!("Row count: {}", self.rows.len()));
        }
        if wants(&["max", "min", "highest", "lowest", "largest", "smallest"]) {
            answered = true;
            lines.push(String::new());
            lines.push("Maximum / minimum:".to_string());
            for (col, stats) in &numeric {
                lines.push(format!(
                    "{}: max {}, min {}",
                    self.columns[*col],
                    tidy(stats.max),
                    tidy(stats.min)
                ));
            }
        }

        if !answered {
            lines.push(String::new());
            lines.push(self.describe());
        }
        lines.join("\n")
    }
}

fn table_error(path: &Path, e: impl fmt::Display) -> AiError {
    AiError::Tool(format!("Cannot read {}: {e}", path.display()))
}

fn header_name(raw: String, index: usize) -> String {
    if raw.trim().is_empty() {
        format!("column_{}", index + 1)
    } else {
        raw.trim().to_string()
    }
}

fn load_csv(path: &Path) -> Result<(Vec<String>, Vec<Vec<CellValue>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| table_error(path, e))?;
    let columns = reader
        .headers()
        .map_err(|e| table_error(path, e))?
        .iter()
        .enumerate()
        .map(|(i, h)| header_name(h.to_string(), i))
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| table_error(path, e))?;
        rows.push(record.iter().map(CellValue::parse).collect());
    }
    Ok((columns, rows))
}

fn load_workbook(
    path: &Path,
    sheet: Option<&str>,
) -> Result<(Vec<String>, String, Vec<String>, Vec<Vec<CellValue>>)> {
    let mut workbook = open_workbook_auto(path).map_err(|e| table_error(path, e))?;
    let sheet_names = workbook.sheet_names().to_vec();
    let name = match sheet {
        Some(wanted) if sheet_names.iter().any(|s| s == wanted) => wanted.to_string(),
        Some(wanted) => {
            return Err(AiError::Tool(format!(
                "Sheet '{wanted}' not found; available sheets: {}",
                sheet_names.join(", ")
            )));
        }
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| table_error(path, "workbook has no sheets"))?,
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| table_error(path, e))?;
    let mut rows = range.rows();
    let columns = rows
        .next()
        .map(|header| {
            header
                .iter()
                .enumerate()
                .map(|(i, cell)| header_name(cell.to_string(), i))
                .collect()
        })
        .unwrap_or_default();
    let rows = rows
        .map(|row| row.iter().map(CellValue::from_data).collect())
        .collect();
    Ok((sheet_names, name, columns, rows))
}

/// Load a CSV file or one sheet of a workbook (the first when `sheet` is `None`).
pub fn load_sheet(path: &Path, sheet: Option<&str>) -> Result<SheetData> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let ext = extension(path);

    if ext == "csv" {
        let (columns, rows) = load_csv(path)?;
        return Ok(SheetData {
            file_name,
            sheet_names: Vec::new(),
            sheet: None,
            columns,
            rows,
        });
    }
    if WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
        let (sheet_names, sheet, columns, rows) = load_workbook(path, sheet)?;
        return Ok(SheetData {
            file_name,
            sheet_names,
            sheet: Some(sheet),
            columns,
            rows,
        });
    }
    Err(AiError::Tool(format!(
        "Unsupported spreadsheet type: .{ext} ({})",
        detect_mime_type(path)
    )))
}

/// [`load_sheet`] off the async runtime.
pub async fn load_sheet_blocking(path: PathBuf, sheet: Option<String>) -> Result<SheetData> {
    tokio::task::spawn_blocking(move || load_sheet(&path, sheet.as_deref()))
        .await
        .map_err(|e| AiError::Tool(format!("Spreadsheet task failed: {e}")))?
}

#[derive(Debug, Deserialize)]
struct ReadSpreadsheetInput {
    file_path: String,
    sheet_name: Option<String>,
}

/// Reports the structure and head rows of a CSV or Excel file.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadSpreadsheetTool;

impl ReadSpreadsheetTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for ReadSpreadsheetTool {
    fn name(&self) -> &str {
        "read_spreadsheet"
    }

    fn description(&self) -> &str {
        "Read an Excel (xlsx, xls, ods) or CSV file. Returns the sheets, shape, column \
         names and types, the first rows, numeric column statistics and missing values."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path of the spreadsheet, e.g. from download_gaia_file"
                },
                "sheet_name": {
                    "type": "string",
                    "description": "Sheet to read (default: the first sheet)"
                }
            },
            "required": ["file_path"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput> {
        let params: ReadSpreadsheetInput = serde_json::from_value(input)?;
        match load_sheet_blocking(params.file_path.into(), params.sheet_name).await {
            Ok(sheet) => Ok(ToolOutput::success(Value::String(sheet.describe()))),
            Err(e) => Ok(ToolOutput::error(e.to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnalyzeSpreadsheetInput {
    file_path: String,
    query: String,
    sheet_name: Option<String>,
}

/// Computes sums, means, counts and extremes of a spreadsheet for a query.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnalyzeSpreadsheetTool;

impl AnalyzeSpreadsheetTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for AnalyzeSpreadsheetTool {
    fn name(&self) -> &str {
        "analyze_spreadsheet_data"
    }

    fn description(&self) -> &str {
        "Answer aggregate questions about a CSV or Excel file. The query may ask for \
         totals, averages, row counts or maximum/minimum values and may name columns."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path of the spreadsheet"
                },
                "query": {
                    "type": "string",
                    "description": "What to compute, e.g. 'total sales per column'"
                },
                "sheet_name": {
                    "type": "string",
                    "description": "Sheet to analyze (default: the first sheet)"
                }
            },
            "required": ["file_path", "query"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput> {
        let params: AnalyzeSpreadsheetInput = serde_json::from_value(input)?;
        match load_sheet_blocking(params.file_path.into(), params.sheet_name).await {
            Ok(sheet) => Ok(ToolOutput::success(Value::String(sheet.analyze(&params.query)))),
            Err(e) => Ok(ToolOutput::error(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALES_CSV: &str = "name,sales,region,units\n\
                             Alpha,10,north,1\n\
                             Beta,20.5,,2\n\
                             Gamma,,south,3\n";

    fn write_csv(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("sales.csv");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_cell_parse() {
        assert_eq!(CellValue::parse(" 42 "), CellValue::Number(42.0));
        assert_eq!(CellValue::parse(""), CellValue::Empty);
        assert_eq!(CellValue::parse("TRUE"), CellValue::Bool(true));
        assert_eq!(CellValue::parse("NaN"), CellValue::Text("NaN".to_string()));
    }

    #[test]
    fn test_is_spreadsheet() {
        assert!(is_spreadsheet(Path::new("a/b.XLSX")));
        assert!(is_spreadsheet(Path::new("b.csv")));
        assert!(!is_spreadsheet(Path::new("b.txt")));
    }

    #[test]
    fn test_load_csv_types_and_stats() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = load_sheet(&write_csv(&dir, SALES_CSV), None).unwrap();

        assert_eq!(sheet.columns, vec!["name", "sales", "region", "units"]);
        assert_eq!(sheet.rows.len(), 3);
        assert_eq!(sheet.column_type(0), "text");
        assert_eq!(sheet.column_type(1), "number");

        let stats = sheet.numeric_stats(1).unwrap();
        assert_eq!(stats.count, 2);
        assert!((stats.sum - 30.5).abs() < 1e-9);
        assert!((stats.mean - 15.25).abs() < 1e-9);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 20.5);
        assert!(sheet.numeric_stats(0).is_none());
        assert_eq!(sheet.missing_counts(), vec![("sales", 1), ("region", 1)]);
    }

    #[test]
    fn test_describe() {
        let dir = tempfile::tempdir().unwrap();
        let text = load_sheet(&write_csv(&dir, SALES_CSV), None)
            .unwrap()
            .describe();

        assert!(text.contains("File: sales.csv"));
        assert!(text.contains("Shape: 3 rows x 4 columns"));
        assert!(text.contains("Column types: name: text, sales: number, region: text, units: number"));
        assert!(text.contains("Beta | 20.5 |  | 2"));
        assert!(text.contains("sales: count 2, sum 30.5, mean 15.25, min 10, max 20.5"));
        assert!(text.contains("Missing values: sales: 1, region: 1"));
        assert!(!text.contains("Sheets:"));
    }

    #[test]
    fn test_analyze_named_column_total() {
        let dir = tempfile::tempdir().unwrap();
        let text = load_sheet(&write_csv(&dir, SALES_CSV), None)
            .unwrap()
            .analyze("What is the total of units?");

        assert!(text.contains("Sums:\nunits: 6"));
        assert!(!text.contains("sales: 30.5"));
    }

    #[test]
    fn test_analyze_without_keywords_falls_back_to_overview() {
        let dir = tempfile::tempdir().unwrap();
        let text = load_sheet(&write_csv(&dir, SALES_CSV), None)
            .unwrap()
            .analyze("Which region is first?");
        assert!(text.contains("Column types:"));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_sheet(Path::new("notes.txt"), None).unwrap_err();
        assert!(err.to_string().contains("Unsupported spreadsheet type: .txt (text/plain)"));
    }

    #[tokio::test]
    async fn test_tools_report_errors_as_output() {
        let output = ReadSpreadsheetTool::new()
            .execute(json!({"file_path": "/nonexistent/book.xlsx"}))
            .await
            .unwrap();
        assert!(!output.success);
        assert!(output.render().starts_with("Error: Tool error: Cannot read"));
    }

    #[tokio::test]
    async fn test_analyze_tool_mean() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, SALES_CSV);
        let output = AnalyzeSpreadsheetTool::new()
            .execute(json!({
                "file_path": path.display().to_string(),
                "query": "average sales"
            }))
            .await
            .unwrap();
        assert!(output.success);
        assert!(output.render().contains("Means:\nsales: 15.25"));
    }
}
