//! Python code execution tool

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::Result;
use crate::tools::traits::{Tool, ToolOutput};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Reads the snippet from stdin and runs it. When the snippet prints
/// nothing, the first conventional answer variable is printed instead,
/// falling back to the value of the last line.
const DRIVER: &str = r##"
import contextlib, io, sys
source = sys.stdin.read()
scope = {"__name__": "__main__"}
buffer = io.StringIO()
with contextlib.redirect_stdout(buffer):
    exec(compile(source, "<python_repl>", "exec"), scope)
printed = buffer.getvalue()
sys.stdout.write(printed)
if not printed.strip():
    for name in ("final_answer", "result", "answer", "output", "total"):
        if name in scope:
            print(scope[name])
            break
    else:
        lines = [line.strip() for line in source.strip().splitlines() if line.strip()]
        if lines and not lines[-1].startswith("#"):
            try:
                value = eval(lines[-1], scope)
            except Exception:
                value = None
            if value is not None:
                print(value)
"##;

#[derive(Debug, Deserialize)]
struct PythonInput {
    code: String,
    timeout_seconds: Option<u64>,
}

/// Runs Python snippets in a fresh `python3` subprocess per call.
pub struct PythonReplTool {
    python_path: String,
}

impl Default for PythonReplTool {
    fn default() -> Self {
        Self::new()
    }
}

impl PythonReplTool {
    pub fn new() -> Self {
        Self::with_python_path("python3")
    }

    pub fn with_python_path(python_path: impl Into<String>) -> Self {
        Self {
            python_path: python_path.into(),
        }
    }
}

#[async_trait]
impl Tool for PythonReplTool {
    fn name(&self) -> &str {
        "python_repl"
    }

    fn description(&self) -> &str {
        "Execute Python code for calculations and data processing. Print the result, \
         or assign it to `result` / `final_answer`. Returns stdout and stderr."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "Python code to execute"
                },
                "timeout_seconds": {
                    "type": "integer",
                    "description": "Execution timeout in seconds (default: 30)"
                }
            },
            "required": ["code"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput> {
        let params: PythonInput = serde_json::from_value(input)?;
        let timeout = params.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS);

        let child = Command::new(&self.python_path)
            .arg("-c")
            .arg(DRIVER)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();
        let mut child = match child {
            Ok(child) => child,
            Err(e) => return Ok(ToolOutput::error(format!("Failed to execute Python: {e}"))),
        };

        if let Some(mut stdin) = child.stdin.take()
            && let Err(e) = stdin.write_all(params.code.as_bytes()).await
        {
            return Ok(ToolOutput::error(format!("Failed to send code to Python: {e}")));
        }

        let result =
            tokio::time::timeout(Duration::from_secs(timeout), child.wait_with_output()).await;

        match result {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);

                if output.status.success() {
                    let stdout = match stdout.trim() {
                        "" => "Code executed successfully (no output)",
                        text => text,
                    };
                    Ok(ToolOutput::success(json!({
                        "stdout": stdout,
                        "stderr": stderr.trim(),
                        "exit_code": 0
                    })))
                } else {
                    Ok(ToolOutput::error(format!(
                        "Python error (exit code {}): {}",
                        output.status.code().unwrap_or(-1),
                        stderr.trim()
                    )))
                }
            }
            Ok(Err(e)) => Ok(ToolOutput::error(format!("Failed to execute Python: {e}"))),
            Err(_) => Ok(ToolOutput::error(format!(
                "Python execution timed out after {timeout}s"
            ))),
        }
    }
}
