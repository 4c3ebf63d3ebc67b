//! Shell command execution with captured output and a wall-clock timeout.

use std::{process::Stdio, time::Duration};

use tokio::{process::Command, time::timeout};
use tracing::{debug, warn};

use super::{ExecutionResult, Failure};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellRunner {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl ShellRunner {
    /// `shell_name` is `auto` or an explicit interpreter such as `bash` or `powershell.exe`.
    pub fn new(shell_name: &str, timeout: Duration) -> Self {
        let (program, args) = shell_invocation(shell_name);
        Self { program, args, timeout }
    }

    pub async fn run(&self, code: &str) -> ExecutionResult {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(code)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %self.program, error = %e, "failed to spawn shell");
                return ExecutionResult::failed(Failure::Spawn(format!("{}: {}", self.program, e)));
            }
        };

        // Dropping the wait future on timeout kills the child.
        let out = match timeout(self.timeout, child.wait_with_output()).await {
            Err(_) => return ExecutionResult::failed(Failure::Timeout(self.timeout)),
            Ok(Err(e)) => return ExecutionResult::failed(Failure::Spawn(e.to_string())),
            Ok(Ok(out)) => out,
        };

        let stdout = String::from_utf8_lossy(&out.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&out.stderr).into_owned();
        debug!(status = ?out.status.code(), "shell command finished");
        if out.status.success() {
            ExecutionResult::ok(stdout, stderr)
        } else {
            ExecutionResult {
                success: false,
                output: stdout,
                stderr,
                failure: Some(Failure::Exit(out.status.code())),
            }
        }
    }
}

/// Program and leading arguments for running one command string.
///
/// On Windows: PowerShell if requested or available (PSModulePath), otherwise cmd.exe.
/// Elsewhere: `/bin/sh` unless a shell is named explicitly.
pub fn shell_invocation(shell_name: &str) -> (String, Vec<String>) {
    let name = shell_name.trim().to_ascii_lowercase();
    let name = if name.is_empty() || name == "auto" {
        if cfg!(windows) {
            if std::env::var("PSModulePath").unwrap_or_default().is_empty() {
                "cmd.exe".to_string()
            } else {
                "powershell.exe".to_string()
            }
        } else {
            "/bin/sh".to_string()
        }
    } else {
        shell_name.trim().to_string()
    };

    let lower = name.to_ascii_lowercase();
    let args: &[&str] = if lower.contains("powershell") || lower.contains("pwsh") {
        &["-NoLogo", "-NoProfile", "-Command"]
    } else if lower == "cmd" || lower == "cmd.exe" {
        &["/c"]
    } else {
        &["-c"]
    };
    (name, args.iter().map(|s| s.to_string()).collect())
}
