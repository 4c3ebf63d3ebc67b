//! Fenced code block extraction from model replies.

use std::{fmt, str::Lines};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Python,
    Shell,
    Text,
}

impl BlockKind {
    /// Maps a fence tag to an executable kind; `None` for anything else.
    pub fn from_fence_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "python" | "python3" | "py" => Some(Self::Python),
            "sh" | "shell" | "bash" | "zsh" => Some(Self::Shell),
            _ => None,
        }
    }

    /// Tag used when writing a block of this kind back into a prompt.
    pub fn fence_tag(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Shell => "sh",
            Self::Text => "text",
        }
    }

    pub fn is_executable(self) -> bool {
        !matches!(self, Self::Text)
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Python => "PYTHON",
            Self::Shell => "SH",
            Self::Text => "TEXT",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub kind: BlockKind,
    pub lines: Vec<String>,
}

impl CodeBlock {
    pub fn new(kind: BlockKind, lines: Vec<String>) -> Self {
        Self { kind, lines }
    }

    pub fn code(&self) -> String {
        self.lines.join("\n")
    }
}

enum State {
    Outside,
    Collecting(BlockKind, Vec<String>),
    /// Inside a fence with a tag we do not run.
    Skipping,
}

/// Lazy iterator over the blocks of one reply, in source order.
///
/// When the reply holds no recognized block, the whole text comes out as a
/// single [`BlockKind::Text`] block.
pub struct Blocks<'a> {
    source: &'a str,
    lines: Lines<'a>,
    state: State,
    emitted: bool,
    finished: bool,
}

pub fn extract_blocks(text: &str) -> Blocks<'_> {
    Blocks {
        source: text,
        lines: text.lines(),
        state: State::Outside,
        emitted: false,
        finished: false,
    }
}

/// Returns the tag of a fence line (possibly empty), or `None` for other lines.
///
/// Annotations glued to the language are cut off: ```` ```python:main.py ````
/// and ```` ```sh{.line-numbers} ```` tag as `python` and `sh`.
fn fence_tag(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix("```")?;
    let word = rest.split_whitespace().next().unwrap_or("");
    Some(word.split([':', '{', ',']).next().unwrap_or(""))
}

impl Iterator for Blocks<'_> {
    type Item = CodeBlock;

    fn next(&mut self) -> Option<CodeBlock> {
        if self.finished {
            return None;
        }
        for line in self.lines.by_ref() {
            let tag = fence_tag(line);
            match &mut self.state {
                State::Outside => {
                    if let Some(tag) = tag {
                        self.state = match BlockKind::from_fence_tag(tag) {
                            Some(kind) => State::Collecting(kind, Vec::new()),
                            None => State::Skipping,
                        };
                    }
                }
                State::Skipping => {
                    if tag.is_some() {
                        self.state = State::Outside;
                    }
                }
                State::Collecting(_, lines) if tag.is_none() => lines.push(line.to_string()),
                State::Collecting(..) => {
                    if let State::Collecting(kind, lines) =
                        std::mem::replace(&mut self.state, State::Outside)
                    {
                        self.emitted = true;
                        return Some(CodeBlock::new(kind, lines));
                    }
                }
            }
        }

        // Unterminated blocks are dropped.
        self.finished = true;
        if self.emitted {
            None
        } else {
            Some(CodeBlock::new(
                BlockKind::Text,
                self.source.lines().map(str::to_string).collect(),
            ))
        }
    }
}
