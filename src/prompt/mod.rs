//! Prompt templates sent to the model.

use crate::blocks::CodeBlock;

/// Asks the model to explain a failure and return corrected code in the same fence format.
pub fn diagnose_prompt(block: &CodeBlock, error: &str) -> String {
    format!(
        "Running this code failed. Analyze the cause and provide a fix.\n\n\
         Original code:\n```{tag}\n{code}\n```\n\n\
         Error output:\n{error}\n\n\
         Please:\n\
         1. Explain the cause of the error\n\
         2. Provide the corrected code in a ```{tag} code block\n\
         3. Briefly summarize what changed",
        tag = block.kind.fence_tag(),
        code = block.code(),
        error = error.trim_end(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{extract_blocks, BlockKind};

    #[test]
    fn diagnose_prompt_fences_the_original_code() {
        let block = CodeBlock::new(BlockKind::Shell, vec!["ls /nope".into(), "echo x".into()]);
        let prompt = diagnose_prompt(&block, "ls: cannot access '/nope'\n");

        assert!(prompt.contains("```sh\nls /nope\necho x\n```"));
        assert!(prompt.contains("Error output:\nls: cannot access '/nope'\n\n"));
        assert!(prompt.contains("corrected code in a ```sh code block"));
    }

    #[test]
    fn embedded_code_extracts_back_out() {
        let block = CodeBlock::new(BlockKind::Python, vec!["result = 1 / 0".into()]);
        let prompt = diagnose_prompt(&block, "ZeroDivisionError: division by zero");
        let first = extract_blocks(&prompt).next().unwrap();
        assert_eq!(first, block);
    }
}
