//! Execution engine: dispatch and result types.

use std::{fmt, time::Duration};

use crate::{
    blocks::{BlockKind, CodeBlock},
    config::Config,
};

pub mod python;
pub mod shell;

pub use python::PythonRunner;
pub use shell::ShellRunner;

pub const NO_RESULT_MESSAGE: &str = "Execution succeeded (no result)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Non-zero exit; `None` when the process died from a signal.
    Exit(Option<i32>),
    Timeout(Duration),
    Raised { kind: String, message: String },
    Spawn(String),
    Unsupported(BlockKind),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exit(Some(code)) => write!(f, "exited with status {}", code),
            Self::Exit(None) => write!(f, "terminated by signal"),
            Self::Timeout(d) => write!(f, "execution timed out after {:?}", d),
            Self::Raised { kind, message } => write!(f, "{}: {}", kind, message),
            Self::Spawn(e) => write!(f, "failed to start: {}", e),
            Self::Unsupported(kind) => write!(f, "{} blocks cannot be executed", kind),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    pub stderr: String,
    pub failure: Option<Failure>,
}

impl ExecutionResult {
    pub fn ok(output: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self { success: true, output: output.into(), stderr: stderr.into(), failure: None }
    }

    /// A failure whose output is the failure text itself.
    pub fn failed(failure: Failure) -> Self {
        Self { success: false, output: failure.to_string(), stderr: String::new(), failure: Some(failure) }
    }

    /// Output and stderr as one text, used when asking for a fix.
    pub fn combined(&self) -> String {
        let mut text = self.output.trim_end().to_string();
        if !self.stderr.trim().is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(self.stderr.trim_end());
        }
        if let Some(failure @ Failure::Exit(_)) = &self.failure {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&format!("({})", failure));
        }
        text
    }
}

#[derive(Debug, Clone)]
pub struct Executor {
    pub shell: ShellRunner,
    pub python: PythonRunner,
}

impl Executor {
    pub fn new(shell: ShellRunner, python: PythonRunner) -> Self {
        Self { shell, python }
    }

    pub fn from_config(cfg: &Config) -> Self {
        let timeout = cfg.exec_timeout();
        let shell_name = cfg.get("SHELL_NAME").unwrap_or_else(|| "auto".into());
        let python_bin = cfg.get("PYTHON_BIN").unwrap_or_else(|| "python3".into());
        Self {
            shell: ShellRunner::new(&shell_name, timeout),
            python: PythonRunner::new(python_bin, timeout),
        }
    }

    pub async fn run(&self, block: &CodeBlock) -> ExecutionResult {
        let code = block.code();
        match block.kind {
            BlockKind::Shell => self.shell.run(&code).await,
            BlockKind::Python => self.python.run(&code).await,
            BlockKind::Text => ExecutionResult::failed(Failure::Unsupported(BlockKind::Text)),
        }
    }
}
