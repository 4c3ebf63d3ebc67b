//! Printers: colored status lines and markdown (termimad).

use owo_colors::OwoColorize;
use termimad::MadSkin;

use crate::{
    blocks::CodeBlock,
    execution::ExecutionResult,
    llm::LlmError,
    safety::Warning,
};

pub struct MarkdownPrinter {
    pub skin: MadSkin,
}

impl Default for MarkdownPrinter {
    fn default() -> Self {
        Self { skin: MadSkin::default() }
    }
}

impl MarkdownPrinter {
    pub fn print(&self, text: &str) {
        self.skin.print_text(text);
        println!();
    }
}

/// Everything the session shows the user goes through here.
pub struct Printer {
    markdown: Option<MarkdownPrinter>,
}

impl Printer {
    pub fn new(markdown: bool) -> Self {
        Self { markdown: markdown.then(MarkdownPrinter::default) }
    }

    pub fn banner(&self) {
        println!("{}", "=== AI code execution assistant ===".cyan());
        println!(
            "{}\n",
            "Type 'quit' to exit | dangerous operations are flagged in red".yellow()
        );
    }

    fn prose(&self, text: &str) {
        match &self.markdown {
            Some(md) => md.print(text),
            None => println!("{}", text),
        }
    }

    pub fn reply(&self, text: &str) {
        println!("\n{}", "AI reply:".bold());
        self.prose(text);
    }

    pub fn code_block(&self, block: &CodeBlock) {
        println!("\n{}", format!("Generated {} code:", block.kind).green());
        println!("{}", block.code());
    }

    pub fn warnings(&self, warnings: &[Warning]) {
        if warnings.is_empty() {
            return;
        }
        println!("\n{}", "Safety warnings:".red());
        for w in warnings {
            println!("{}", format!("⚠ {}", w).red());
        }
    }

    pub fn execution_result(&self, result: &ExecutionResult) {
        println!("\n{}", "=== Execution result ===".cyan());
        let failure_text = result.failure.as_ref().map(ToString::to_string);
        let output = result.output.trim_end();
        if !output.is_empty() && failure_text.as_deref() != Some(output) {
            println!("{}", output);
        }
        if !result.stderr.trim().is_empty() {
            println!("{}", result.stderr.trim_end().yellow());
        }
        if let Some(failure) = &result.failure {
            println!("{}", format!("Execution failed: {}", failure).red());
        }
    }

    pub fn diagnosing(&self) {
        println!("{}", "Diagnosing the problem...".blue());
    }

    pub fn diagnosis(&self, text: &str) {
        println!("\n{}", "Diagnosis:".green());
        self.prose(text);
    }

    pub fn api_error(&self, err: &LlmError) {
        match err {
            LlmError::Status { status, code, message, request_id } => {
                println!("{}", format!("[API error] request_id={}", request_id).red());
                println!("{}", format!("status={} code={}", status.as_u16(), code).red());
                println!("{}", format!("message={}", message).red());
            }
            other => println!("{}", format!("[API error] {}", other).red()),
        }
    }

    pub fn notice(&self, text: &str) {
        println!("{}", text.yellow());
    }

    pub fn error(&self, text: &str) {
        println!("{}", text.red());
    }
}
