//! Runner for external media tools (ffprobe, ffmpeg) with a hard deadline.
//!
//! The child is spawned with `kill_on_drop`, so when the deadline passes or
//! the calling future is dropped the process is killed instead of being left
//! running in the background.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error};

/// Default deadline for a single tool invocation: 5 minutes.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(300);

/// Errors raised while running an external tool
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{tool} timed out after {timeout:?}")]
    TimedOut { tool: String, timeout: Duration },

    #[error("I/O error waiting for {tool}: {source}")]
    Wait {
        tool: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured output of a successful run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// A single external tool invocation.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        let arg = path.to_string_lossy().into_owned();
        self.arg(arg)
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.to_string_lossy().into_owned())
    }

    /// Run to completion, failing on spawn errors, non-zero exit or timeout.
    pub async fn execute(&self) -> Result<ToolOutput, ToolError> {
        let tool = self.tool_name();
        debug!(tool = %tool, args = ?self.args, "Running external tool");

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ToolError::Spawn {
                tool: tool.clone(),
                source,
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => return Err(ToolError::Wait { tool, source }),
            Err(_elapsed) => {
                // Dropping the wait future drops the child, which kills it.
                error!(tool = %tool, timeout = ?self.timeout, "External tool timed out");
                return Err(ToolError::TimedOut {
                    tool,
                    timeout: self.timeout,
                });
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            error!(tool = %tool, status = %output.status, "External tool failed");
            return Err(ToolError::Failed {
                tool,
                status: output.status,
                stderr,
            });
        }

        Ok(ToolOutput {
            stdout: output.stdout,
            stderr,
        })
    }
}
