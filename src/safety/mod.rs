//! Advisory danger patterns. Nothing here blocks execution.

use std::fmt;

use crate::blocks::BlockKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Warning {
    pub pattern: &'static str,
    pub message: &'static str,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "potentially dangerous operation `{}`: {}", self.pattern.trim_end(), self.message)
    }
}

const SHELL_PATTERNS: &[(&str, &str)] = &[
    ("rm ", "deletes files"),
    ("chmod", "changes file permissions"),
    ("chown", "changes file ownership"),
    ("sudo", "runs with elevated privileges"),
    (">", "redirects output and may overwrite a file"),
    ("|", "pipes output into another command"),
    ("&", "backgrounds or chains commands"),
    ("`", "runs a command substitution"),
];

const PYTHON_PATTERNS: &[(&str, &str)] = &[
    ("os.system", "runs a shell command"),
    ("subprocess", "spawns processes"),
    ("eval", "evaluates dynamic code"),
    ("exec", "executes dynamic code"),
    ("open(", "opens files"),
    ("import os", "imports operating system access"),
];

pub fn patterns(kind: BlockKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        BlockKind::Shell => SHELL_PATTERNS,
        BlockKind::Python => PYTHON_PATTERNS,
        BlockKind::Text => &[],
    }
}

/// Warnings for every pattern found in `code`, each at most once, in table order.
pub fn scan(kind: BlockKind, code: &str) -> Vec<Warning> {
    patterns(kind)
        .iter()
        .filter(|(pattern, _)| code.contains(pattern))
        .map(|&(pattern, message)| Warning { pattern, message })
        .collect()
}
