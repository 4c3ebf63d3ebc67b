//! Python snippets run in a child interpreter with builtins removed.
//!
//! Emptying `__builtins__` only stops casual calls such as `open` or
//! `print`. It is not a security boundary; attribute walks through object
//! internals still reach everything. The child process keeps hangs and
//! crashes away from the assistant, nothing more.

use std::{process::Stdio, time::Duration};

use serde::Deserialize;
use tokio::{io::AsyncWriteExt, process::Command, time::timeout};
use tracing::{debug, warn};

use super::{ExecutionResult, Failure, NO_RESULT_MESSAGE};

/// Reads the snippet from stdin; a top-level `result` becomes the output.
const BOOTSTRAP: &str = r#"
import json, sys
source = sys.stdin.read()
scope = {}
try:
    exec(compile(source, "<snippet>", "exec"), {"__builtins__": {}}, scope)
    report = {"ok": True}
    if "result" in scope:
        report["result"] = str(scope["result"])
except BaseException as exc:
    report = {"ok": False, "kind": type(exc).__name__, "message": str(exc)}
sys.stdout.write("\n" + json.dumps(report) + "\n")
sys.stdout.flush()
"#;

#[derive(Debug, Deserialize)]
struct Report {
    ok: bool,
    result: Option<String>,
    kind: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PythonRunner {
    pub program: String,
    pub timeout: Duration,
}

impl PythonRunner {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self { program: program.into(), timeout }
    }

    pub async fn run(&self, code: &str) -> ExecutionResult {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-u") // unbuffered
            .arg("-c")
            .arg(BOOTSTRAP)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %self.program, error = %e, "failed to spawn python");
                return ExecutionResult::failed(Failure::Spawn(format!("{}: {}", self.program, e)));
            }
        };

        // The snippet write shares the time limit with the wait; an interpreter
        // that never reads stdin would otherwise block on a full pipe.
        let stdin = child.stdin.take();
        let finished = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(code.as_bytes()).await?;
                // stdin is dropped here so the bootstrap sees EOF
            }
            child.wait_with_output().await
        };

        let out = match timeout(self.timeout, finished).await {
            Err(_) => return ExecutionResult::failed(Failure::Timeout(self.timeout)),
            Ok(Err(e)) => return ExecutionResult::failed(Failure::Spawn(e.to_string())),
            Ok(Ok(out)) => out,
        };

        let stdout = String::from_utf8_lossy(&out.stdout);
        let stderr = String::from_utf8_lossy(&out.stderr).into_owned();
        debug!(status = ?out.status.code(), "python snippet finished");

        match parse_report(&stdout) {
            Some(report) => report_to_result(report, stderr),
            None => ExecutionResult {
                success: false,
                output: stdout.trim().to_string(),
                stderr,
                failure: Some(Failure::Exit(out.status.code())),
            },
        }
    }
}

/// The report is the last non-empty line the bootstrap writes.
fn parse_report(stdout: &str) -> Option<Report> {
    let line = stdout.lines().rev().find(|l| !l.trim().is_empty())?;
    serde_json::from_str(line.trim()).ok()
}

fn report_to_result(report: Report, stderr: String) -> ExecutionResult {
    if report.ok {
        let output = report.result.unwrap_or_else(|| NO_RESULT_MESSAGE.to_string());
        return ExecutionResult::ok(output, stderr);
    }
    let mut result = ExecutionResult::failed(Failure::Raised {
        kind: report.kind.unwrap_or_else(|| "Exception".into()),
        message: report.message.unwrap_or_default(),
    });
    result.stderr = stderr;
    result
}
