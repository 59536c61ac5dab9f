//! Line-based [`Prompter`] on the controlling terminal.
//!
//! Questions go to stderr so that stdout carries only command output.
//! End of input cancels every kind of prompt.

use async_trait::async_trait;
use rootcause::Report;
use speechkit_core::{InputConfig, PromptError, Prompter, SelectConfig};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

fn io_error(err: &std::io::Error) -> Report<PromptError> {
    PromptError::Io {
        reason: err.to_string(),
    }
    .into()
}

/// Maps a 1-based answer to an index into `count` options.
fn parse_selection(answer: &str, count: usize) -> Option<usize> {
    answer
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=count).contains(n))
        .map(|n| n - 1)
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub struct TerminalPrompter {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }
}

impl TerminalPrompter {
    async fn write(&self, text: &str) -> Result<(), Report<PromptError>> {
        let mut err = tokio::io::stderr();
        err.write_all(text.as_bytes())
            .await
            .map_err(|e| io_error(&e))?;
        err.flush().await.map_err(|e| io_error(&e))
    }

    /// `None` at end of input.
    async fn read_line(&self) -> Result<Option<String>, Report<PromptError>> {
        self.lines
            .lock()
            .await
            .next_line()
            .await
            .map_err(|e| io_error(&e))
    }
}

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn select_option(
        &self,
        config: &SelectConfig,
    ) -> Result<Option<String>, Report<PromptError>> {
        let mut menu = format!("\n{}\n", config.title);
        for (i, option) in config.options.iter().enumerate() {
            menu.push_str(&format!("  {:>2}) {}\n", i + 1, option.label));
        }
        self.write(&menu).await?;

        loop {
            self.write(&format!("{} [1-{}]: ", config.name, config.options.len()))
                .await?;
            let Some(answer) = self.read_line().await? else {
                return Ok(None);
            };
            if answer.trim().is_empty() {
                return Ok(None);
            }
            match parse_selection(&answer, config.options.len()) {
                Some(i) => return Ok(Some(config.options[i].id.clone())),
                None => self.write("  Enter one of the listed numbers.\n").await?,
            }
        }
    }

    async fn input_text(
        &self,
        config: &InputConfig,
    ) -> Result<Option<String>, Report<PromptError>> {
        if let Some(message) = &config.validation_message {
            self.write(&format!("  ! {message}\n")).await?;
        }
        let question = match &config.default {
            Some(default) => format!("{} [{default}]: ", config.prompt),
            None => format!("{}: ", config.prompt),
        };
        self.write(&question).await?;

        let Some(answer) = self.read_line().await? else {
            return Ok(None);
        };
        if answer.trim().is_empty() {
            return Ok(config.default.clone());
        }
        Ok(Some(answer))
    }

    async fn confirm(&self, message: &str, action: &str) -> Result<bool, Report<PromptError>> {
        self.write(&format!("\n{message}\n{action}? [y/N]: ")).await?;
        Ok(self.read_line().await?.is_some_and(|a| is_yes(&a)))
    }
}
