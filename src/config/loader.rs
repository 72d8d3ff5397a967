//! Configuration loading and discovery for `tilestamp.toml`
//!
//! Provides functions to find, load, and override configuration.

use super::schema::TilestampConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file searched for.
pub const CONFIG_FILE_NAME: &str = "tilestamp.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse tilestamp.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override storage root
    pub data_dir: Option<PathBuf>,
    /// Override current user id
    pub user_id: Option<u64>,
}

/// Find tilestamp.toml by walking up from the current working directory,
/// then in `XDG_CONFIG_HOME/tilestamp/` (or `~/.config/tilestamp/`).
pub fn find_config() -> Option<PathBuf> {
    if let Ok(cwd) = env::current_dir() {
        if let Some(path) = find_config_from(cwd) {
            return Some(path);
        }
    }

    find_xdg_config()
}

/// Find tilestamp.toml in the XDG config directory.
pub fn find_xdg_config() -> Option<PathBuf> {
    let xdg_config = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;

    let config_path = xdg_config.join("tilestamp").join(CONFIG_FILE_NAME);
    if config_path.exists() {
        Some(config_path)
    } else {
        None
    }
}

/// Find tilestamp.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a file, or from the discovered file when `path`
/// is `None`. Falls back to defaults when nothing is found.
pub fn load_config(path: Option<&Path>) -> Result<TilestampConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => {
            tracing::debug!("Loading config from {}", p.display());
            load_config_file(&p)
        }
        None => Ok(TilestampConfig::default()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<TilestampConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: TilestampConfig = toml::from_str(&contents)?;
    check(config)
}

fn check(config: TilestampConfig) -> Result<TilestampConfig, ConfigError> {
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }
    Ok(config)
}

/// Merge CLI overrides into a configuration. CLI arguments take precedence.
pub fn merge_cli_overrides(config: &mut TilestampConfig, overrides: &CliOverrides) {
    if let Some(ref data_dir) = overrides.data_dir {
        config.storage.data_dir = data_dir.clone();
    }

    if let Some(user_id) = overrides.user_id {
        config.identity.user_id = user_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        File::create(&config_path)
            .expect("should create config file")
            .write_all(b"[grid]\ntile_size = 10")
            .expect("should write config content");

        let subdir = temp.path().join("art").join("castle");
        fs::create_dir_all(&subdir).expect("should create subdirectories");

        assert_eq!(find_config_from(subdir), Some(config_path));
    }

    #[test]
    fn test_find_config_not_found() {
        let temp = TempDir::new().expect("should create temp dir");
        assert_eq!(find_config_from(temp.path().to_path_buf()), None);
    }

    #[test]
    fn test_load_config_from_file() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&config_path, "[grid]\ntile_size = 10\n[identity]\nuser_id = 7").expect("should write config");

        let config = load_config(Some(&config_path)).expect("should load config");
        assert_eq!(config.grid.tile_size, 10);
        assert_eq!(config.identity.user_id, 7);
    }

    #[test]
    fn test_load_config_reports_validation_errors() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&config_path, "[grid]\ntile_size = 0").expect("should write config");

        let err = load_config(Some(&config_path)).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("grid.tile_size"));
    }

    #[test]
    fn test_load_config_parse_error() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&config_path, "[grid\ntile_size = ").expect("should write config");
        assert!(matches!(load_config(Some(&config_path)), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_merge_cli_overrides() {
        let mut config = TilestampConfig::default();
        let overrides = CliOverrides { data_dir: Some(PathBuf::from("/data")), user_id: Some(9) };
        merge_cli_overrides(&mut config, &overrides);
        assert_eq!(config.storage.data_dir, PathBuf::from("/data"));
        assert_eq!(config.identity.user_id, 9);
    }
}
