//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod draw;
mod templates;
mod transfer;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::config::{load_config, merge_cli_overrides, CliOverrides, TilestampConfig};
use crate::error::EngineError;
use crate::manager::TemplateManager;
use crate::persist::{FileStore, StorageChain};

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Tilestamp - Overlay pixel-art templates on a tiled canvas
#[derive(Parser)]
#[command(name = "tstamp")]
#[command(about = "Tilestamp - Overlay pixel-art templates on a tiled canvas")]
#[command(version)]
pub struct Cli {
    /// Path to tilestamp.toml (discovered from the working directory if omitted)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the template stores
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Numeric user id encoded into new template keys
    #[arg(long, global = true)]
    pub user_id: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a template from an image file
    Create {
        /// Template image (PNG, JPEG, GIF, WebP, ...)
        image: PathBuf,

        /// Anchor coordinates as tileX,tileY,pixelX,pixelY
        #[arg(long, allow_hyphen_values = true)]
        coords: String,

        /// Display name (defaults to the image file stem)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Delete a template by key
    Delete {
        /// Composite key, e.g. "0 !"
        key: String,
    },

    /// Enable a template
    Enable {
        /// Composite key
        key: String,
    },

    /// Disable a template
    Disable {
        /// Composite key
        key: String,
    },

    /// Enable every template
    EnableAll,

    /// Disable every template
    DisableAll,

    /// Rename a template
    Rename {
        /// Composite key
        key: String,

        /// New display name (1 to 100 characters)
        name: String,
    },

    /// Move a template to new anchor coordinates
    Move {
        /// Composite key
        key: String,

        /// New anchor as tileX,tileY,pixelX,pixelY
        #[arg(allow_hyphen_values = true)]
        coords: String,
    },

    /// List all templates in draw order
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Import templates from an exported document (additive)
    Import {
        /// JSON document to import
        input: PathBuf,
    },

    /// Export all templates as a JSON document
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Draw enabled templates over a live tile image
    Draw {
        /// Live tile image
        tile_image: PathBuf,

        /// Tile indices as tileX,tileY
        #[arg(long, value_parser = draw::parse_tile)]
        tile: (u32, u32),

        /// Output file (default: {input}_overlay.png)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pass the tile through without drawing any template
        #[arg(long)]
        no_templates: bool,
    },
}

/// Install the stderr logger. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

/// Resolve the effective configuration from file and flags.
fn resolve_config(cli: &Cli) -> Result<TilestampConfig, ExitCode> {
    let mut config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Err(ExitCode::from(EXIT_INVALID_ARGS));
        }
    };
    let overrides = CliOverrides { data_dir: cli.data_dir.clone(), user_id: cli.user_id };
    merge_cli_overrides(&mut config, &overrides);
    Ok(config)
}

/// Build the storage chain and load the stored templates.
///
/// The primary store is scoped to the current identity; the fallback store
/// survives identity renames.
pub(crate) fn open_manager(config: &TilestampConfig) -> Result<TemplateManager, ExitCode> {
    let storage = StorageChain::new(Box::new(FileStore::new(
        "primary",
        config.storage.primary_path(&config.identity.name),
    )))
    .with_fallback(Box::new(FileStore::new("fallback", config.storage.fallback_path())));

    TemplateManager::load(config, storage).map_err(|e| {
        eprintln!("Error: Failed to load templates: {}", e);
        ExitCode::from(EXIT_ERROR)
    })
}

/// Print an engine error and pick its exit code. Rejected input maps to
/// `EXIT_INVALID_ARGS`.
pub(crate) fn report_error(err: &EngineError) -> ExitCode {
    eprintln!("Error: {}", err);
    match err {
        EngineError::Validation(_) | EngineError::Decode(_) | EngineError::UnknownTemplate(_) => {
            ExitCode::from(EXIT_INVALID_ARGS)
        }
        _ => ExitCode::from(EXIT_ERROR),
    }
}

/// Parse a comma-separated coordinate list into raw numbers.
///
/// Range and integrality checks happen in the engine.
pub(crate) fn parse_number_list(input: &str) -> Result<Vec<f64>, String> {
    input
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<f64>().map_err(|_| format!("'{}' is not a number", part))
        })
        .collect()
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(code) => return code,
    };

    match cli.command {
        Commands::Create { image, coords, name } => {
            templates::run_create(&config, &image, &coords, name.as_deref())
        }
        Commands::Delete { key } => templates::run_delete(&config, &key),
        Commands::Enable { key } => templates::run_toggle(&config, &key, true),
        Commands::Disable { key } => templates::run_toggle(&config, &key, false),
        Commands::EnableAll => templates::run_set_all(&config, true),
        Commands::DisableAll => templates::run_set_all(&config, false),
        Commands::Rename { key, name } => templates::run_rename(&config, &key, &name),
        Commands::Move { key, coords } => templates::run_move(&config, &key, &coords),
        Commands::List { json } => templates::run_list(&config, json),
        Commands::Import { input } => transfer::run_import(&config, &input),
        Commands::Export { output } => transfer::run_export(&config, output.as_deref()),
        Commands::Draw { tile_image, tile, output, no_templates } => {
            draw::run_draw(&config, &tile_image, tile, output.as_deref(), no_templates)
        }
    }
}
