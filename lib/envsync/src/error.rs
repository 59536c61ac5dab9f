//! Error types for the envsync crate.

use std::fmt;
use std::path::Path;

/// Errors from reading or writing project files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvSyncError {
    /// Reading, creating or writing a file failed.
    Io { path: String, reason: String },
    /// `config.json` exists but is not a JSON object.
    InvalidJson { path: String, reason: String },
}

impl EnvSyncError {
    pub(crate) fn io(path: &Path, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }

    /// Short stable name used in error codes.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Io { .. } => "FileIo",
            Self::InvalidJson { .. } => "InvalidConfigJson",
        }
    }
}

impl fmt::Display for EnvSyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, reason } => write!(f, "cannot access {path}: {reason}"),
            Self::InvalidJson { path, reason } => write!(f, "{path} is not valid: {reason}"),
        }
    }
}

impl std::error::Error for EnvSyncError {}
