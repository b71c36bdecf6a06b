use dialoguer::Confirm;

use crate::error::{Error, Result};

/// Asks the operator a yes/no question before a mutation step
pub trait Prompt {
    fn ask(&self, question: &str) -> Result<bool>;
}

/// Terminal confirmation through dialoguer. Enter alone means yes.
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn ask(&self, question: &str) -> Result<bool> {
        Confirm::new()
            .with_prompt(question)
            .default(true)
            .interact()
            .map_err(Error::Prompt)
    }
}
