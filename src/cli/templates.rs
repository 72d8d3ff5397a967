//! Template management commands: create, delete, toggle, rename, move, list

use std::path::Path;
use std::process::ExitCode;

use super::{open_manager, parse_number_list, report_error, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::author::decode_author_id;
use crate::config::TilestampConfig;
use crate::models::{CompositeKey, Coords};
use crate::status::format_count;

/// Execute the create command
pub fn run_create(config: &TilestampConfig, image: &Path, coords: &str, name: Option<&str>) -> ExitCode {
    let coords = match parse_number_list(coords).and_then(|n| Coords::from_numbers(&n).map_err(|e| e.to_string())) {
        Ok(coords) => coords,
        Err(e) => {
            eprintln!("Error: Invalid --coords: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let name = name
        .map(String::from)
        .unwrap_or_else(|| image.file_stem().unwrap_or_default().to_string_lossy().to_string());

    let bytes = match std::fs::read(image) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error: Cannot read '{}': {}", image.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let mut manager = match open_manager(config) {
        Ok(manager) => manager,
        Err(code) => return code,
    };

    match manager.create_template(&bytes, &name, coords) {
        Ok(status) => {
            println!("{}", status);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => report_error(&e),
    }
}

/// Execute the delete command
pub fn run_delete(config: &TilestampConfig, key: &str) -> ExitCode {
    let mut manager = match open_manager(config) {
        Ok(manager) => manager,
        Err(code) => return code,
    };

    match manager.delete_template(key) {
        Ok(()) => {
            println!("Deleted template {}", key);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => report_error(&e),
    }
}

/// Execute the enable / disable commands
pub fn run_toggle(config: &TilestampConfig, key: &str, enabled: bool) -> ExitCode {
    let mut manager = match open_manager(config) {
        Ok(manager) => manager,
        Err(code) => return code,
    };

    match manager.toggle_template(key, enabled) {
        Ok(()) => {
            println!("{} template {}", if enabled { "Enabled" } else { "Disabled" }, key);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => report_error(&e),
    }
}

/// Execute the enable-all / disable-all commands
pub fn run_set_all(config: &TilestampConfig, enabled: bool) -> ExitCode {
    let mut manager = match open_manager(config) {
        Ok(manager) => manager,
        Err(code) => return code,
    };

    match manager.set_all_templates_enabled(enabled) {
        Ok(count) => {
            println!("{} {} template(s)", if enabled { "Enabled" } else { "Disabled" }, count);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => report_error(&e),
    }
}

/// Execute the rename command
pub fn run_rename(config: &TilestampConfig, key: &str, name: &str) -> ExitCode {
    let mut manager = match open_manager(config) {
        Ok(manager) => manager,
        Err(code) => return code,
    };

    match manager.update_template_name(key, name) {
        Ok(status) => {
            println!("{}", status);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => report_error(&e),
    }
}

/// Execute the move command
pub fn run_move(config: &TilestampConfig, key: &str, coords: &str) -> ExitCode {
    let numbers = match parse_number_list(coords) {
        Ok(numbers) => numbers,
        Err(e) => {
            eprintln!("Error: Invalid coordinates: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let mut manager = match open_manager(config) {
        Ok(manager) => manager,
        Err(code) => return code,
    };

    match manager.update_template_coordinates(key, &numbers) {
        Ok(status) => {
            println!("{}", status);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => report_error(&e),
    }
}

/// Execute the list command
pub fn run_list(config: &TilestampConfig, json: bool) -> ExitCode {
    let manager = match open_manager(config) {
        Ok(manager) => manager,
        Err(code) => return code,
    };
    let summaries = manager.get_all_templates();

    if json {
        match serde_json::to_string_pretty(&summaries) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
        return ExitCode::from(EXIT_SUCCESS);
    }

    if summaries.is_empty() {
        println!("No templates.");
        return ExitCode::from(EXIT_SUCCESS);
    }

    for summary in &summaries {
        let pixels = summary.pixel_count.map(format_count).unwrap_or_else(|| "?".to_string());
        let author = summary
            .key
            .parse::<CompositeKey>()
            .ok()
            .and_then(|key| decode_author_id(&key.author_id))
            .map(|id| format!("user {}", id))
            .unwrap_or_else(|| "user ?".to_string());
        let [tx, ty, px, py] = summary.coords;
        println!(
            "{:>12}  {:<8}  {},{},{},{}  {} px  {}  {}",
            summary.key,
            if summary.enabled { "enabled" } else { "disabled" },
            tx,
            ty,
            px,
            py,
            pixels,
            author,
            summary.name
        );
    }
    ExitCode::from(EXIT_SUCCESS)
}
