//! Tilestamp - pixel-art template overlays for tile-based canvases
//!
//! This library provides functionality to:
//! - Chunk a template image along the host tile grid with pixel shredding
//! - Composite enabled templates over live tiles by priority
//! - Persist, import and merge template collections as JSON documents

pub mod author;
pub mod chunker;
pub mod cli;
pub mod compositor;
pub mod config;
pub mod error;
pub mod import;
pub mod manager;
pub mod models;
pub mod output;
pub mod persist;
pub mod reconstruct;
pub mod status;

pub use error::{EngineError, Result};
pub use manager::TemplateManager;
