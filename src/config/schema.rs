//! Configuration schema types for `tilestamp.toml`
//!
//! Defines the structure and validation rules for engine configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::import::DEFAULT_HEURISTIC_PIXELS_PER_FRAGMENT;
use crate::models::TileGrid;

/// Identity stamped into written documents and checked on import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Current tool identity (`whoami`)
    #[serde(default = "default_identity_name")]
    pub name: String,
    /// Earlier identities whose documents are still accepted
    #[serde(default = "default_aliases")]
    pub aliases: Vec<String>,
    /// Numeric id of the current user, encoded into author IDs
    #[serde(default)]
    pub user_id: u64,
}

fn default_identity_name() -> String {
    "Tilestamp".to_string()
}

fn default_aliases() -> Vec<String> {
    vec!["TileStamp".to_string(), "Tilestamp-Legacy".to_string()]
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self { name: default_identity_name(), aliases: default_aliases(), user_id: 0 }
    }
}

impl IdentityConfig {
    /// Every identity an imported document may carry.
    pub fn accepted(&self) -> Vec<String> {
        std::iter::once(self.name.clone()).chain(self.aliases.iter().cloned()).collect()
    }
}

/// Where documents are stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for all stores
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Identity-independent key of the fallback store
    #[serde(default = "default_fallback_key")]
    pub fallback_key: String,
}

fn default_data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".local").join("share")))
        .map(|base| base.join("tilestamp"))
        .unwrap_or_else(|_| PathBuf::from(".tilestamp"))
}

fn default_fallback_key() -> String {
    "tilestamp-templates".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: default_data_dir(), fallback_key: default_fallback_key() }
    }
}

impl StorageConfig {
    /// Identity-scoped primary document path.
    pub fn primary_path(&self, identity: &str) -> PathBuf {
        self.data_dir.join(identity).join("templates.json")
    }

    /// Fixed-key fallback document path.
    pub fn fallback_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", self.fallback_key))
    }
}

/// Import behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Pixels assumed per fragment when a count cannot be reconstructed
    #[serde(default = "default_heuristic")]
    pub heuristic_pixels_per_fragment: u64,
}

fn default_heuristic() -> u64 {
    DEFAULT_HEURISTIC_PIXELS_PER_FRAGMENT
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self { heuristic_pixels_per_fragment: default_heuristic() }
    }
}

/// Root of `tilestamp.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TilestampConfig {
    #[serde(default)]
    pub grid: TileGrid,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default, rename = "import")]
    pub import_config: ImportConfig,
}

/// A single config validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl TilestampConfig {
    /// Validate the configuration, returning every problem found.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.grid.tile_size == 0 {
            errors.push(ConfigValidationError {
                field: "grid.tile_size".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        if self.grid.draw_multiplier == 0 || self.grid.draw_multiplier % 2 == 0 {
            errors.push(ConfigValidationError {
                field: "grid.draw_multiplier".to_string(),
                message: "must be an odd positive integer".to_string(),
            });
        }

        if self.grid.max_tile_index > 9999 {
            errors.push(ConfigValidationError {
                field: "grid.max_tile_index".to_string(),
                message: "must fit in four digits (at most 9999)".to_string(),
            });
        }

        if self.identity.name.is_empty() || self.identity.name.contains(['/', '\\']) {
            errors.push(ConfigValidationError {
                field: "identity.name".to_string(),
                message: "must be a non-empty name without path separators".to_string(),
            });
        }

        if self.storage.fallback_key.is_empty() {
            errors.push(ConfigValidationError {
                field: "storage.fallback_key".to_string(),
                message: "must be a non-empty string".to_string(),
            });
        }

        errors
    }
}
