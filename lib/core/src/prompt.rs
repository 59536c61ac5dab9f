//! Abstract selection interface.
//!
//! Provisioning logic never talks to a terminal or an editor directly; it
//! asks a [`Prompter`]. Every call is a cancellable suspension point with a
//! three-way outcome: a value (`Ok(Some(..))`), a cancellation (`Ok(None)`),
//! or a failure of the prompt mechanism itself (`Err(..)`).

use async_trait::async_trait;
use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry of a single-choice picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionItem {
    /// Value returned when this option is picked.
    pub id: String,
    /// Text shown to the user.
    pub label: String,
}

impl OptionItem {
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// A single-choice picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectConfig {
    /// Short name of the thing being picked, e.g. "Region".
    pub name: String,
    pub title: String,
    pub options: Vec<OptionItem>,
}

impl SelectConfig {
    #[must_use]
    pub fn new(name: impl Into<String>, title: impl Into<String>, options: Vec<OptionItem>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            options,
        }
    }
}

/// A free-text input box.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputConfig {
    pub prompt: String,
    pub placeholder: Option<String>,
    /// Pre-filled value; accepting it unchanged returns it.
    pub default: Option<String>,
    /// Message explaining why the previous entry was rejected.
    pub validation_message: Option<String>,
}

impl InputConfig {
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Uses `value` as both placeholder and default.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.placeholder = Some(value.clone());
        self.default = Some(value);
        self
    }

    #[must_use]
    pub fn with_validation_message(mut self, message: Option<String>) -> Self {
        self.validation_message = message;
        self
    }
}

/// Result of [`Prompter::choose_or_create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    /// The prepended "create new" entry was picked.
    CreateNew,
    /// An existing option was picked; carries its id.
    Existing(String),
}

/// Failures of the prompt mechanism (not user cancellation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    /// Reading from or writing to the interaction channel failed.
    Io { reason: String },
    /// The picker had nothing to offer.
    EmptyOptions { name: String },
    /// The answer did not match any offered option.
    InvalidAnswer { answer: String },
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { reason } => write!(f, "prompt I/O failed: {reason}"),
            Self::EmptyOptions { name } => write!(f, "no options to select for {name}"),
            Self::InvalidAnswer { answer } => write!(f, "'{answer}' is not one of the options"),
        }
    }
}

impl std::error::Error for PromptError {}

/// Interactive capability consumed by the provisioning workflow.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Shows a picker and returns the id of the chosen option.
    async fn select_option(
        &self,
        config: &SelectConfig,
    ) -> Result<Option<String>, Report<PromptError>>;

    /// Asks for a line of text. Empty answers count as cancellation.
    async fn input_text(&self, config: &InputConfig)
    -> Result<Option<String>, Report<PromptError>>;

    /// Modal yes/no question; `action` labels the affirmative answer.
    async fn confirm(&self, message: &str, action: &str) -> Result<bool, Report<PromptError>>;

    /// Picks one option; an empty list is an error rather than a silent skip.
    async fn choose_one(
        &self,
        config: &SelectConfig,
    ) -> Result<Option<String>, Report<PromptError>> {
        if config.options.is_empty() {
            return Err(PromptError::EmptyOptions {
                name: config.name.clone(),
            }
            .into());
        }
        self.select_option(config).await
    }

    /// Picks an existing option or the `create` entry, which is shown first.
    async fn choose_or_create(
        &self,
        config: &SelectConfig,
        create: OptionItem,
    ) -> Result<Option<Choice>, Report<PromptError>> {
        let mut options = Vec::with_capacity(config.options.len() + 1);
        options.push(create.clone());
        options.extend(config.options.iter().cloned());
        let picker = SelectConfig {
            options,
            ..config.clone()
        };
        Ok(self.select_option(&picker).await?.map(|id| {
            if id == create.id {
                Choice::CreateNew
            } else {
                Choice::Existing(id)
            }
        }))
    }
}
