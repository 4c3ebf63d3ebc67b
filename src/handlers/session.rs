//! Interactive session: request, review, execute, and fix on failure.
//!
//! Blocks from a reply wait in a queue. When a block fails and the user asks
//! for a fix, the fixed blocks go to the front of the queue so the rest of
//! the original reply still runs afterwards. Fixes are bounded by a
//! per-request [`RetryBudget`].

use std::{collections::VecDeque, future::Future, time::Instant};

use anyhow::Result;
use tracing::{error, info, warn};

use crate::{
    blocks::{extract_blocks, CodeBlock},
    console::{Console, Input},
    execution::Executor,
    llm::Completer,
    printer::Printer,
    prompt::diagnose_prompt,
    safety::scan,
};

const REQUEST_PROMPT: &str = "Request: ";
const CONFIRM_PROMPT: &str = "\nExecute? (y = run, s = skip, n = stop this reply, q = quit): ";
const RETRY_PROMPT: &str = "Execution failed, ask for a fix? (y/n): ";
const CONFIRM_HINT: &str = "Please answer y (run), s (skip), n (stop this reply) or q (quit)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    used: usize,
    max: usize,
}

impl RetryBudget {
    pub fn new(max: usize) -> Self {
        Self { used: 0, max }
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn remaining(&self) -> usize {
        self.max.saturating_sub(self.used)
    }

    /// Takes one retry; false once the budget is spent.
    pub fn consume(&mut self) -> bool {
        if self.remaining() == 0 {
            return false;
        }
        self.used += 1;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Aborted,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirm {
    Execute,
    Skip,
    /// Drop the rest of this reply.
    Abort,
    Quit,
}

impl Confirm {
    /// `None` for unrecognized input; an empty answer skips.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" | "e" => Some(Self::Execute),
            "" | "s" | "skip" | "r" => Some(Self::Skip),
            "n" | "no" => Some(Self::Abort),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

pub fn is_quit_command(input: &str) -> bool {
    let lower = input.trim().to_ascii_lowercase();
    lower == "quit" || lower == "exit"
}

fn is_yes(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

enum Reply {
    Text(String),
    Failed,
    Interrupted,
}

/// Runs `fut` unless Ctrl-C arrives first.
async fn interruptible<F: Future>(fut: F) -> Option<F::Output> {
    tokio::select! {
        out = fut => Some(out),
        Ok(()) = tokio::signal::ctrl_c() => None,
    }
}

pub struct Session<L, C> {
    llm: L,
    console: C,
    executor: Executor,
    printer: Printer,
    max_retries: usize,
}

impl<L: Completer, C: Console> Session<L, C> {
    pub fn new(llm: L, console: C, executor: Executor, printer: Printer, max_retries: usize) -> Self {
        Self { llm, console, executor, printer, max_retries }
    }

    pub fn completer(&self) -> &L {
        &self.llm
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    /// Reads requests until `quit`, `exit` or end of input. A failing turn never ends the session.
    pub async fn run(&mut self) -> Result<()> {
        self.printer.banner();
        loop {
            let line = match self.console.read_request(REQUEST_PROMPT)? {
                Input::Line(line) => line,
                Input::Interrupted => {
                    self.printer.notice("Interrupted current operation");
                    continue;
                }
                Input::Eof => break,
            };
            let request = line.trim();
            if request.is_empty() {
                continue;
            }
            if is_quit_command(request) {
                break;
            }
            match self.handle_request(request).await {
                Ok(TurnOutcome::Quit) => break,
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "turn failed");
                    self.printer.error(&format!("system error: {:#}", e));
                }
            }
        }
        Ok(())
    }

    pub async fn handle_request(&mut self, request: &str) -> Result<TurnOutcome> {
        let text = match self.ask(request).await {
            Reply::Text(text) => text,
            Reply::Failed => return Ok(TurnOutcome::Aborted),
            Reply::Interrupted => return Ok(self.interrupted()),
        };

        let mut queue: VecDeque<CodeBlock> = extract_blocks(&text).collect();
        let mut budget = RetryBudget::new(self.max_retries);

        while let Some(block) = queue.pop_front() {
            if !block.kind.is_executable() {
                self.printer.reply(&block.code());
                continue;
            }

            let code = block.code();
            self.printer.code_block(&block);
            self.printer.warnings(&scan(block.kind, &code));

            let choice = loop {
                match self.console.read_line(CONFIRM_PROMPT)? {
                    Input::Line(line) => match Confirm::parse(&line) {
                        Some(choice) => break choice,
                        None => self.printer.notice(CONFIRM_HINT),
                    },
                    Input::Interrupted => return Ok(self.interrupted()),
                    Input::Eof => return Ok(TurnOutcome::Quit),
                }
            };
            match choice {
                Confirm::Execute => {}
                Confirm::Skip => continue,
                Confirm::Abort => return Ok(TurnOutcome::Aborted),
                Confirm::Quit => return Ok(TurnOutcome::Quit),
            }

            let started = Instant::now();
            let Some(result) = interruptible(self.executor.run(&block)).await else {
                return Ok(self.interrupted());
            };
            info!(
                kind = %block.kind,
                success = result.success,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "block executed"
            );
            self.printer.execution_result(&result);
            if result.success {
                continue;
            }

            if budget.remaining() == 0 {
                self.printer.notice(&format!(
                    "Retry limit ({}) reached for this request; no further fixes offered",
                    budget.max()
                ));
                continue;
            }
            match self.console.read_line(RETRY_PROMPT)? {
                Input::Line(line) if is_yes(&line) => {}
                Input::Line(_) => continue,
                Input::Interrupted => return Ok(self.interrupted()),
                Input::Eof => return Ok(TurnOutcome::Quit),
            }
            budget.consume();
            info!(used = budget.used(), max = budget.max(), "requesting fix");

            self.printer.diagnosing();
            let diagnosis = match self.ask(&diagnose_prompt(&block, &result.combined())).await {
                Reply::Text(text) => text,
                Reply::Failed => continue,
                Reply::Interrupted => return Ok(self.interrupted()),
            };
            self.printer.diagnosis(&diagnosis);

            let fixes: Vec<CodeBlock> = extract_blocks(&diagnosis)
                .filter(|b| b.kind.is_executable())
                .collect();
            if fixes.is_empty() {
                self.printer.notice("The diagnosis contained no runnable code");
            }
            for fix in fixes.into_iter().rev() {
                queue.push_front(fix);
            }
        }

        Ok(TurnOutcome::Completed)
    }

    async fn ask(&self, prompt: &str) -> Reply {
        match interruptible(self.llm.complete(prompt)).await {
            None => Reply::Interrupted,
            Some(Ok(text)) => Reply::Text(text),
            Some(Err(e)) => {
                warn!(error = %e, "completion failed");
                self.printer.api_error(&e);
                Reply::Failed
            }
        }
    }

    fn interrupted(&self) -> TurnOutcome {
        self.printer.notice("\nInterrupted current operation");
        TurnOutcome::Aborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_stops_at_max() {
        let mut budget = RetryBudget::new(2);
        assert_eq!(budget.remaining(), 2);
        assert!(budget.consume());
        assert!(budget.consume());
        assert!(!budget.consume());
        assert_eq!(budget.used(), 2);
        assert_eq!(budget.remaining(), 0);
    }

    #[test]
    fn zero_budget_never_retries() {
        let mut budget = RetryBudget::new(0);
        assert!(!budget.consume());
        assert_eq!(budget.used(), 0);
    }

    #[test]
    fn confirm_choices() {
        assert_eq!(Confirm::parse("Y"), Some(Confirm::Execute));
        assert_eq!(Confirm::parse(" e "), Some(Confirm::Execute));
        assert_eq!(Confirm::parse("s"), Some(Confirm::Skip));
        assert_eq!(Confirm::parse("r"), Some(Confirm::Skip));
        assert_eq!(Confirm::parse(""), Some(Confirm::Skip));
        assert_eq!(Confirm::parse("n"), Some(Confirm::Abort));
        assert_eq!(Confirm::parse("q"), Some(Confirm::Quit));
    }

    #[test]
    fn typos_are_not_choices() {
        assert_eq!(Confirm::parse("ee"), None);
        assert_eq!(Confirm::parse("yy"), None);
        assert_eq!(Confirm::parse("run it"), None);
    }

    #[test]
    fn quit_commands_ignore_case() {
        assert!(is_quit_command("QUIT"));
        assert!(is_quit_command(" exit "));
        assert!(!is_quit_command("quit now"));
    }
}
