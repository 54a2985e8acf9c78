use console::{style, Term};
use coupongo::error::{CouponError, Result};
use std::str::FromStr;

/// Line-based prompts on stderr, so stdout only carries rendered output.
pub struct Prompter {
    term: Term,
}

impl Prompter {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.term.is_term()
    }

    fn ensure_interactive(&self, label: &str) -> Result<()> {
        if self.is_interactive() {
            return Ok(());
        }
        Err(CouponError::Prompt(format!(
            "'{}' needs a terminal; pass it as a flag instead",
            label
        )))
    }

    fn ask(&self, label: &str, hint: Option<&str>) -> Result<String> {
        let hint = hint
            .map(|h| format!(" {}", style(format!("({})", h)).dim()))
            .unwrap_or_default();
        self.term
            .write_str(&format!("{}{}: ", style(label).bold(), hint))
            .map_err(prompt_error)?;
        let line = self.term.read_line().map_err(prompt_error)?;
        Ok(line.trim().to_string())
    }

    pub fn say(&self, line: &str) -> Result<()> {
        self.term.write_line(line).map_err(prompt_error)
    }

    /// Free text; empty input is allowed.
    pub fn text(&self, label: &str) -> Result<String> {
        self.ensure_interactive(label)?;
        self.ask(label, None)
    }

    pub fn text_or(&self, label: &str, default: &str) -> Result<String> {
        self.ensure_interactive(label)?;
        let value = self.ask(label, Some(default))?;
        Ok(if value.is_empty() {
            default.to_string()
        } else {
            value
        })
    }

    pub fn optional(&self, label: &str) -> Result<Option<String>> {
        let value = self.text(label)?;
        Ok((!value.is_empty()).then_some(value))
    }

    /// Hidden input for API keys.
    pub fn secret(&self, label: &str) -> Result<String> {
        self.ensure_interactive(label)?;
        self.term
            .write_str(&format!("{}: ", style(label).bold()))
            .map_err(prompt_error)?;
        let line = self.term.read_secure_line().map_err(prompt_error)?;
        Ok(line.trim().to_string())
    }

    /// Re-asks until the input parses and passes `check`. Empty input yields
    /// `None`, unless `required`.
    pub fn parsed<T, F>(&self, label: &str, required: bool, check: F) -> Result<Option<T>>
    where
        T: FromStr,
        F: Fn(&T) -> std::result::Result<(), String>,
    {
        self.ensure_interactive(label)?;
        let hint = if required { None } else { Some("optional") };
        loop {
            let raw = self.ask(label, hint)?;
            if raw.is_empty() && !required {
                return Ok(None);
            }
            match raw.parse::<T>() {
                Ok(value) => match check(&value) {
                    Ok(()) => return Ok(Some(value)),
                    Err(msg) => self.say(&style(msg).red().to_string())?,
                },
                Err(_) => self.say(&style("invalid number").red().to_string())?,
            }
        }
    }

    pub fn positive(&self, label: &str, required: bool) -> Result<Option<i64>> {
        self.parsed(label, required, |v: &i64| {
            if *v > 0 {
                Ok(())
            } else {
                Err("must be greater than 0".to_string())
            }
        })
    }

    /// Numbered menu; returns the chosen index. Empty input picks the first item.
    pub fn select(&self, label: &str, items: &[&str]) -> Result<usize> {
        self.ensure_interactive(label)?;
        self.say(&style(label).bold().to_string())?;
        for (i, item) in items.iter().enumerate() {
            self.say(&format!("  {}) {}", i + 1, item))?;
        }
        loop {
            let raw = self.ask("Choice", Some("1"))?;
            if raw.is_empty() {
                return Ok(0);
            }
            match raw.parse::<usize>() {
                Ok(n) if n >= 1 && n <= items.len() => return Ok(n - 1),
                _ => self.say(&style("pick one of the listed numbers").red().to_string())?,
            }
        }
    }

    /// `[y/N]` question. Without a terminal the answer is no.
    pub fn confirm(&self, question: &str) -> Result<bool> {
        if !self.is_interactive() {
            return Ok(false);
        }
        let answer = self.ask(question, Some("y/N"))?;
        Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

fn prompt_error(err: std::io::Error) -> CouponError {
    CouponError::Prompt(err.to_string())
}
