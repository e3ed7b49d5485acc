// Terminal UI utilities: status printing and operator confirmation.

use anyhow::Result;
use colored::Colorize;
use std::io::Write;

pub fn print_success(message: &str) {
    println!("{}", format!("OK {}", message).bright_green().bold());
}

pub fn print_error(message: &str) {
    eprintln!("{}", format!("ERROR {}", message).bright_red().bold());
}

pub fn print_info(message: &str) {
    println!("{}", message.bright_cyan());
}

pub fn print_warning(message: &str) {
    println!("{}", format!("WARNING {}", message).bright_yellow());
}

/// Operator confirmation seam.
///
/// Destructive operations (service restarts, database swaps) ask before
/// acting. Injecting the prompt lets tests script the answers and lets
/// `--yes` turn every question into an automatic approval.
pub trait Prompt: Send + Sync {
    fn confirm(&self, message: &str) -> Result<bool>;
}

/// Interactive prompt reading from stdin. Empty input counts as yes.
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn confirm(&self, message: &str) -> Result<bool> {
        print!("{} [Y/n] ", message);
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        let answer = input.trim().to_lowercase();

        Ok(answer.is_empty() || answer == "y" || answer == "yes")
    }
}

/// Non-interactive prompt for `--yes` runs: approves everything.
pub struct AssumeYes;

impl Prompt for AssumeYes {
    fn confirm(&self, _message: &str) -> Result<bool> {
        Ok(true)
    }
}


#[cfg(test)]
mod tests {
    use super::scripted::ScriptedPrompt;
    use super::*;

    #[test]
    fn test_assume_yes() {
        assert!(AssumeYes.confirm("Restart?").unwrap());
    }

    #[test]
    fn test_scripted_prompt_replays_answers() {
        let prompt = ScriptedPrompt::new(&[true, false]);
        assert!(prompt.confirm("first?").unwrap());
        assert!(!prompt.confirm("second?").unwrap());
        assert_eq!(prompt.questions.lock().unwrap().len(), 2);
    }
}
