//! External command tools.
//!
//! A command tool runs one process per call. The argument object goes to the
//! child's stdin as a single JSON document and the child's stdout is read
//! back as the JSON result. The child is killed if the call outlives its
//! timeout.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use super::error::ToolError;
use super::handlers::{ToolCall, ToolHandler};
use super::registry::Tool;

/// Default timeout for command tools (30 seconds).
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 30_000;

/// Handler that runs an external program.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    program: PathBuf,
    args: Vec<String>,
    working_dir: PathBuf,
    timeout: Duration,
}

impl CommandHandler {
    /// Create a handler for `argv`, resolved against `manifest_dir`.
    ///
    /// A program containing a path separator is taken relative to the
    /// manifest directory; a bare name is looked up on `PATH`.
    pub fn new(argv: &[String], manifest_dir: &Path, timeout_ms: Option<u64>) -> Self {
        let (program, args) = match argv.split_first() {
            Some((program, args)) => (program.as_str(), args.to_vec()),
            None => ("", Vec::new()),
        };

        let program = if program.contains('/') && Path::new(program).is_relative() {
            manifest_dir.join(program)
        } else {
            PathBuf::from(program)
        };

        Self {
            program,
            args,
            working_dir: manifest_dir.to_path_buf(),
            timeout: Duration::from_millis(timeout_ms.unwrap_or(DEFAULT_COMMAND_TIMEOUT_MS)),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Payload written to the child's stdin.
    fn stdin_payload(call: &ToolCall) -> Result<Vec<u8>, ToolError> {
        let mut args = call.args.clone();
        if let Some(registry) = &call.registry {
            args.insert(Tool::REGISTRY_PARAM.to_string(), json!(registry.definitions()));
        }
        serde_json::to_vec(&Value::Object(args)).map_err(|e| ToolError::internal(e.to_string()))
    }

    async fn run(&self, payload: Vec<u8>) -> Result<Value, ToolError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ToolError::execution_failed(format!(
                    "failed to start {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        // Feed stdin while draining stdout; a child that echoes as it reads
        // would otherwise stall once both pipe buffers fill.
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                // A child that exits without reading its input is not an error.
                if let Err(e) = stdin.write_all(&payload).await {
                    debug!("Command closed stdin early: {}", e);
                }
            }
        };

        let ((), output) = tokio::join!(feed, child.wait_with_output());
        let output =
            output.map_err(|e| ToolError::internal(format!("failed to wait for command: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let first_line = stderr.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
            let status = output
                .status
                .code()
                .map(|c| format!("exit code {}", c))
                .unwrap_or_else(|| "terminated by signal".to_string());
            return Err(ToolError::execution_failed(if first_line.is_empty() {
                format!("command failed with {}", status)
            } else {
                format!("command failed with {}: {}", status, first_line.trim())
            }));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(stdout.trim())
            .map_err(|e| ToolError::execution_failed(format!("command output is not JSON: {}", e)))
    }
}

#[async_trait::async_trait]
impl ToolHandler for CommandHandler {
    #[instrument(skip_all, fields(program = %self.program.display()))]
    async fn call(&self, call: ToolCall) -> Result<Value, ToolError> {
        let payload = Self::stdin_payload(&call)?;
        let timeout_ms = self.timeout.as_millis() as u64;

        match tokio::time::timeout(self.timeout, self.run(payload)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Command timed out after {} ms", timeout_ms);
                Err(ToolError::Timeout(timeout_ms))
            }
        }
    }
}
