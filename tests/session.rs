#![cfg(unix)]

use std::{collections::VecDeque, sync::Mutex, time::Duration};

use anyhow::Result;
use bash_qwen::{
    console::{Console, Input},
    execution::{Executor, PythonRunner, ShellRunner},
    handlers::{Session, TurnOutcome},
    llm::{Completer, LlmError},
    printer::Printer,
};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;

/// Replies from a fixed script and records every prompt it was sent.
#[derive(Default)]
struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn new(replies: Vec<Result<String, LlmError>>) -> Self {
        Self { replies: Mutex::new(replies.into()), prompts: Mutex::default() }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Completer for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("no more replies".to_string()))
    }
}

/// Answers prompts from a fixed script; end of script reads as end of input.
struct ScriptedConsole {
    answers: VecDeque<Input>,
    asked: Vec<String>,
    /// Lines read as requests, the ones a terminal would keep in history.
    requests: Vec<String>,
}

impl ScriptedConsole {
    fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| Input::Line(a.to_string())).collect(),
            asked: Vec::new(),
            requests: Vec::new(),
        }
    }

    fn with_inputs(answers: Vec<Input>) -> Self {
        Self { answers: answers.into(), asked: Vec::new(), requests: Vec::new() }
    }
}

impl Console for ScriptedConsole {
    fn read_line(&mut self, prompt: &str) -> Result<Input> {
        self.asked.push(prompt.trim().to_string());
        Ok(self.answers.pop_front().unwrap_or(Input::Eof))
    }

    fn read_request(&mut self, prompt: &str) -> Result<Input> {
        let input = self.read_line(prompt)?;
        if let Input::Line(line) = &input {
            self.requests.push(line.clone());
        }
        Ok(input)
    }
}

fn session(
    replies: Vec<Result<String, LlmError>>,
    console: ScriptedConsole,
    max_retries: usize,
) -> Session<ScriptedModel, ScriptedConsole> {
    let timeout = Duration::from_secs(10);
    let executor = Executor::new(ShellRunner::new("/bin/sh", timeout), PythonRunner::new("python3", timeout));
    Session::new(ScriptedModel::new(replies), console, executor, Printer::new(false), max_retries)
}

fn reply(text: &str) -> Result<String, LlmError> {
    Ok(text.to_string())
}

fn retry_offers(console: &ScriptedConsole) -> usize {
    console.asked.iter().filter(|p| p.starts_with("Execution failed")).count()
}

#[tokio::test]
async fn retries_stop_at_the_budget_even_when_the_user_keeps_saying_yes() {
    let failing = "Try this:\n```sh\nexit 1\n```";
    let mut s = session(
        vec![reply(failing), reply(failing), reply(failing), reply(failing)],
        ScriptedConsole::new(&["y"; 20]),
        2,
    );

    let outcome = s.handle_request("do something").await.unwrap();

    assert_eq!(outcome, TurnOutcome::Completed);
    // initial request plus exactly two diagnose cycles
    assert_eq!(s.completer().prompts().len(), 3);
    assert_eq!(retry_offers(s.console()), 2);
    // three executions confirmed, two retries accepted
    assert_eq!(s.console().answers.len(), 20 - 5);
}

#[tokio::test]
async fn diagnose_prompt_carries_code_and_error() {
    let mut s = session(
        vec![reply("```sh\necho broken >&2; exit 4\n```"), reply("No idea, sorry.")],
        ScriptedConsole::new(&["y", "y"]),
        3,
    );

    s.handle_request("break it").await.unwrap();

    let prompts = s.completer().prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("```sh\necho broken >&2; exit 4\n```"));
    assert!(prompts[1].contains("broken"));
    assert!(prompts[1].contains("exited with status 4"));
}

#[tokio::test]
async fn fixes_run_before_the_rest_of_the_original_reply() {
    let marker = tempfile::tempdir().unwrap();
    let log = marker.path().join("order.log");
    let log = log.display();
    let first = format!(
        "```sh\necho first >> {log}; exit 1\n```\n```sh\necho second >> {log}\n```"
    );
    let fix = format!("Fixed:\n```sh\necho fix >> {log}\n```");
    let mut s = session(
        vec![reply(&first), reply(&fix)],
        // execute first, accept retry, execute fix, execute second
        ScriptedConsole::new(&["y", "y", "y", "y"]),
        3,
    );

    assert_eq!(s.handle_request("go").await.unwrap(), TurnOutcome::Completed);

    let written = std::fs::read_to_string(marker.path().join("order.log")).unwrap();
    assert_eq!(written, "first\nfix\nsecond\n");
}

#[tokio::test]
async fn declining_a_retry_moves_on_to_the_next_block() {
    let mut s = session(
        vec![reply("```sh\nexit 1\n```\n```sh\necho after\n```")],
        ScriptedConsole::new(&["y", "n", "y"]),
        3,
    );

    assert_eq!(s.handle_request("go").await.unwrap(), TurnOutcome::Completed);
    assert_eq!(s.completer().prompts().len(), 1);
    assert!(s.console().answers.is_empty());
}

#[tokio::test]
async fn zero_budget_never_offers_a_retry() {
    let mut s = session(vec![reply("```sh\nexit 1\n```")], ScriptedConsole::new(&["y", "y"]), 0);

    s.handle_request("go").await.unwrap();
    assert_eq!(retry_offers(s.console()), 0);
    assert_eq!(s.console().answers.len(), 1);
}

#[tokio::test]
async fn skip_abort_and_quit_choices() {
    let three = "```sh\necho a\n```\n```sh\necho b\n```\n```sh\necho c\n```";

    let mut s = session(vec![reply(three)], ScriptedConsole::new(&["s", "s", "s"]), 3);
    assert_eq!(s.handle_request("go").await.unwrap(), TurnOutcome::Completed);
    assert_eq!(s.console().asked.len(), 3);

    let mut s = session(vec![reply(three)], ScriptedConsole::new(&["s", "n", "y"]), 3);
    assert_eq!(s.handle_request("go").await.unwrap(), TurnOutcome::Aborted);
    assert_eq!(s.console().asked.len(), 2);

    let mut s = session(vec![reply(three)], ScriptedConsole::new(&["q", "y"]), 3);
    assert_eq!(s.handle_request("go").await.unwrap(), TurnOutcome::Quit);
    assert_eq!(s.console().asked.len(), 1);
}

#[tokio::test]
async fn typo_at_confirmation_asks_again() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("ran.log");
    let block = format!("```sh\necho ran >> {}\n```", log.display());
    let mut s = session(vec![reply(&block)], ScriptedConsole::new(&["ee", "y"]), 3);

    assert_eq!(s.handle_request("go").await.unwrap(), TurnOutcome::Completed);
    assert_eq!(s.console().asked.len(), 2);
    assert!(s.console().asked.iter().all(|p| p.starts_with("Execute?")));
    assert_eq!(std::fs::read_to_string(&log).unwrap(), "ran\n");
}

#[tokio::test]
async fn empty_confirmation_skips_without_running() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("ran.log");
    let block = format!("```sh\necho ran >> {}\n```", log.display());
    let mut s = session(vec![reply(&block)], ScriptedConsole::new(&["", "y"]), 3);

    assert_eq!(s.handle_request("go").await.unwrap(), TurnOutcome::Completed);
    assert_eq!(s.console().asked.len(), 1);
    assert!(!log.exists());
}

#[tokio::test]
async fn confirmation_answers_are_not_read_as_requests() {
    let mut s = session(
        vec![reply("```sh\nexit 1\n```"), reply("No fix.")],
        ScriptedConsole::new(&["list files", "y", "y", "quit"]),
        3,
    );

    s.run().await.unwrap();

    assert_eq!(s.console().requests, vec!["list files", "quit"]);
    assert_eq!(s.console().asked.len(), 4);
}

#[tokio::test]
async fn prose_only_reply_asks_nothing() {
    let mut s = session(vec![reply("The answer is 42.")], ScriptedConsole::new(&[]), 3);
    assert_eq!(s.handle_request("what?").await.unwrap(), TurnOutcome::Completed);
    assert!(s.console().asked.is_empty());
}

#[tokio::test]
async fn interrupt_at_confirmation_aborts_the_turn() {
    let mut s = session(
        vec![reply("```sh\necho a\n```")],
        ScriptedConsole::with_inputs(vec![Input::Interrupted]),
        3,
    );
    assert_eq!(s.handle_request("go").await.unwrap(), TurnOutcome::Aborted);
}

#[tokio::test]
async fn remote_failure_aborts_turn_but_not_session() {
    let api_error = LlmError::Status {
        status: StatusCode::UNAUTHORIZED,
        code: "InvalidApiKey".into(),
        message: "Invalid API-key provided.".into(),
        request_id: "req-1".into(),
    };
    let mut s = session(
        vec![Err(api_error), reply("second reply")],
        ScriptedConsole::new(&["first request", "second request", "quit", "never read"]),
        3,
    );

    s.run().await.unwrap();

    assert_eq!(s.completer().prompts(), vec!["first request", "second request"]);
    assert_eq!(s.console().answers.len(), 1);
}

#[tokio::test]
async fn run_skips_blank_lines_and_stops_at_end_of_input() {
    let mut s = session(
        vec![reply("ok")],
        ScriptedConsole::with_inputs(vec![
            Input::Line("   ".into()),
            Input::Interrupted,
            Input::Line("hello".into()),
        ]),
        3,
    );

    s.run().await.unwrap();
    assert_eq!(s.completer().prompts(), vec!["hello"]);
}

#[tokio::test]
async fn quit_inside_a_turn_ends_the_session() {
    let mut s = session(
        vec![reply("```sh\necho a\n```")],
        ScriptedConsole::new(&["go", "q", "another request"]),
        3,
    );

    s.run().await.unwrap();
    assert_eq!(s.completer().prompts().len(), 1);
    assert_eq!(s.console().answers.len(), 1);
}
