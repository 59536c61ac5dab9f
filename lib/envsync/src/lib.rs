//! Writes speech resource credentials into a sample project.
//!
//! Two files are kept in sync: the env file the samples load at startup
//! (`.env/.env.dev` by default) and, when present, the sample's
//! `config.json`.

pub mod env_file;
pub mod error;
pub mod json_config;
pub mod project;

pub use env_file::{EnvKey, read_env_value, upsert_lines, write_credentials};
pub use error::EnvSyncError;
pub use json_config::{apply_credentials, update_json_config};
pub use project::{ProjectLayout, SyncReport, credential_pairs};
