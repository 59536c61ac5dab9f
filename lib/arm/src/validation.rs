//! Naming rules for resource groups and Cognitive Services accounts.
//!
//! Syntax checks here are pure. The live half of validation (does the name
//! already exist?) lives on the client traits, which run these checks first
//! so an invalid name never costs a network call.

use std::fmt;

const INSTANCE_NAME_MIN: usize = 2;
const INSTANCE_NAME_MAX: usize = 63;
const RESOURCE_GROUP_NAME_MAX: usize = 90;

/// Why a proposed name was rejected. `Display` is the message shown inline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidName {
    Length { min: usize, max: usize },
    InstanceCharacters,
    InstanceEdges,
    ConsecutiveHyphens,
    ResourceGroupCharacters,
    TrailingPeriod,
    ResourceGroupExists { name: String },
    InstanceUnavailable { name: String, reason: Option<String> },
}

impl fmt::Display for InvalidName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Length { min, max } => {
                write!(f, "The name must be between {min} and {max} characters long.")
            }
            Self::InstanceCharacters => write!(
                f,
                "The name can only contain lowercase letters, numbers and hyphens."
            ),
            Self::InstanceEdges => {
                write!(f, "The name must start and end with a letter or number.")
            }
            Self::ConsecutiveHyphens => write!(f, "The name cannot contain '--'."),
            Self::ResourceGroupCharacters => write!(
                f,
                "Resource group names can only include letters, numbers, underscores, periods, hyphens and parentheses."
            ),
            Self::TrailingPeriod => write!(f, "Resource group names cannot end with a period."),
            Self::ResourceGroupExists { name } => {
                write!(f, "Resource group '{name}' already exists.")
            }
            Self::InstanceUnavailable { name, reason } => match reason {
                Some(reason) if !reason.is_empty() => {
                    write!(f, "The name '{name}' is not available: {reason}")
                }
                _ => write!(f, "The name '{name}' is not available."),
            },
        }
    }
}

/// Checks a Cognitive Services account name, which doubles as its custom subdomain.
///
/// # Errors
///
/// Returns the first rule the name breaks.
pub fn check_instance_name(name: &str) -> Result<(), InvalidName> {
    let len = name.chars().count();
    if !(INSTANCE_NAME_MIN..=INSTANCE_NAME_MAX).contains(&len) {
        return Err(InvalidName::Length {
            min: INSTANCE_NAME_MIN,
            max: INSTANCE_NAME_MAX,
        });
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(InvalidName::InstanceCharacters);
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(InvalidName::InstanceEdges);
    }
    if name.contains("--") {
        return Err(InvalidName::ConsecutiveHyphens);
    }
    Ok(())
}

/// Checks a resource group name.
///
/// # Errors
///
/// Returns the first rule the name breaks.
pub fn check_resource_group_name(name: &str) -> Result<(), InvalidName> {
    let len = name.chars().count();
    if !(1..=RESOURCE_GROUP_NAME_MAX).contains(&len) {
        return Err(InvalidName::Length {
            min: 1,
            max: RESOURCE_GROUP_NAME_MAX,
        });
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '(' | ')'))
    {
        return Err(InvalidName::ResourceGroupCharacters);
    }
    if name.ends_with('.') {
        return Err(InvalidName::TrailingPeriod);
    }
    Ok(())
}
