//! Operator console seam: printed summaries and typed confirmations.
//!
//! # Invariants
//! - Prompts end with the accepted answers, e.g. `(DELETE/no): `.
//! - End of input counts as a declined confirmation.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Line-oriented operator I/O.
pub trait Console {
    /// Prints one line for the operator.
    fn say(&mut self, line: &str);
    /// Prints `prompt` without a newline and reads one answer line.
    fn ask(&mut self, prompt: &str) -> io::Result<String>;
}

/// Typed answer a prompt accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// The answer must equal this word exactly (case-sensitive).
    Exact(&'static str),
    /// `yes`/`y` in any case.
    YesNo,
}

impl Confirmation {
    /// Suffix appended to prompts.
    pub fn hint(self) -> String {
        match self {
            Self::Exact(word) => format!("({word}/no)"),
            Self::YesNo => "(yes/no)".to_string(),
        }
    }

    pub fn accepts(self, response: &str) -> bool {
        let response = response.trim_end_matches(['\r', '\n']);
        match self {
            Self::Exact(word) => response == word,
            Self::YesNo => matches!(
                response.trim().to_ascii_lowercase().as_str(),
                "yes" | "y"
            ),
        }
    }
}

/// Prompts the operator and reports whether they confirmed.
pub fn confirm(
    console: &mut dyn Console,
    question: &str,
    confirmation: Confirmation,
) -> io::Result<bool> {
    let response = console.ask(&format!("\n{question}? {}: ", confirmation.hint()))?;
    Ok(confirmation.accepts(&response))
}

/// Console bound to the process stdin/stdout.
#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn say(&mut self, line: &str) {
        println!("{line}");
    }

    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(prompt.as_bytes())?;
        stdout.flush()?;
        drop(stdout);

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(answer)
    }
}

/// Console fed from a fixed list of answers that records everything shown.
///
/// Used for unattended runs and tests. Once answers run out, further prompts
/// read as end of input.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    answers: VecDeque<String>,
    transcript: Vec<String>,
    prompts: Vec<String>,
}

impl ScriptedConsole {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            transcript: Vec::new(),
            prompts: Vec::new(),
        }
    }

    /// Every line printed through `say`.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Every prompt shown through `ask`.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn printed(&self, needle: &str) -> bool {
        self.transcript.iter().any(|line| line.contains(needle))
    }
}

impl Console for ScriptedConsole {
    fn say(&mut self, line: &str) {
        self.transcript.push(line.to_string());
    }

    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        self.prompts.push(prompt.to_string());
        Ok(self.answers.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::{confirm, Confirmation, ScriptedConsole};

    #[test]
    fn exact_confirmation_is_case_sensitive() {
        let delete = Confirmation::Exact("DELETE");
        assert!(delete.accepts("DELETE\n"));
        assert!(!delete.accepts("delete"));
        assert!(!delete.accepts(" DELETE"));
        assert!(!delete.accepts(""));
        assert_eq!(delete.hint(), "(DELETE/no)");
    }

    #[test]
    fn yes_no_confirmation_ignores_case_and_padding() {
        let yes = Confirmation::YesNo;
        assert!(yes.accepts("YES\r\n"));
        assert!(yes.accepts(" y "));
        assert!(!yes.accepts("yep"));
        assert!(!yes.accepts("no"));
    }

    #[test]
    fn confirm_formats_prompt_and_consumes_answers() {
        let mut console = ScriptedConsole::new(["DELETE"]);
        assert!(confirm(&mut console, "Confirm deletion", Confirmation::Exact("DELETE")).unwrap());
        assert!(!confirm(&mut console, "Again", Confirmation::Exact("DELETE")).unwrap());
        assert_eq!(console.prompts()[0], "\nConfirm deletion? (DELETE/no): ");
    }
}
