//! Script-backed executor.
//!
//! Spawns an external script with the device's configuration values (in
//! declaration order) and the string form of the target value as arguments:
//!
//! ```text
//! [interpreter] <script> <config...> <target>
//! ```
//!
//! Success is exit status 0; any non-zero status is a normal failure signal
//! carrying the code. Output is not parsed.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::{ExecutionError, ExecutionRequest, ExecutionResult, Executor};

/// Executor that applies values by invoking an external script.
#[derive(Debug, Clone)]
pub struct ScriptExecutor {
    interpreter: Option<String>,
    script: PathBuf,
}

impl ScriptExecutor {
    /// Run the script directly (it must be executable).
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: None,
            script: script.into(),
        }
    }

    /// Run the script through an interpreter, e.g. `python`.
    pub fn with_interpreter(interpreter: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: Some(interpreter.into()),
            script: script.into(),
        }
    }

    pub fn script_path(&self) -> &PathBuf {
        &self.script
    }

    fn command(&self, request: &ExecutionRequest) -> Command {
        let mut cmd = match &self.interpreter {
            Some(interpreter) => {
                let mut cmd = Command::new(interpreter);
                cmd.arg(&self.script);
                cmd
            }
            None => Command::new(&self.script),
        };
        cmd.args(request.config.args());
        cmd.arg(request.target.to_string());
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Executor for ScriptExecutor {
    async fn run(&self, request: &ExecutionRequest, timeout: Duration) -> ExecutionResult {
        debug!(
            device_id = %request.device_id,
            script = %self.script.display(),
            target = %request.target,
            "invoking script"
        );

        let mut child = match self.command(request).spawn() {
            Ok(child) => child,
            Err(e) => return ExecutionResult::failed(ExecutionError::Spawn(e.to_string())),
        };

        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) if status.success() => ExecutionResult::ok(),
            Ok(Ok(status)) => {
                ExecutionResult::failed(ExecutionError::ExitCode(status.code().unwrap_or(-1)))
            }
            Ok(Err(e)) => ExecutionResult::failed(ExecutionError::Spawn(e.to_string())),
            Err(_) => {
                // Reclaim the hung process; kill_on_drop backstops this
                let _ = child.start_kill();
                ExecutionResult::failed(ExecutionError::Timeout)
            }
        }
    }
}
