//! Ask a hosted Qwen application for code, review it, and run it locally.

pub mod blocks;
pub mod config;
pub mod console;
pub mod execution;
pub mod handlers;
pub mod llm;
pub mod printer;
pub mod prompt;
pub mod safety;
