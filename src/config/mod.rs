//! Configuration module
//!
//! Provides types and parsing for `tilestamp.toml`.

pub mod loader;
pub mod schema;

pub use loader::{load_config, merge_cli_overrides, CliOverrides, ConfigError, CONFIG_FILE_NAME};
pub use schema::*;
