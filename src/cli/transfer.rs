//! Import and export of template documents

use std::path::Path;
use std::process::ExitCode;

use super::{open_manager, report_error, EXIT_ERROR, EXIT_SUCCESS};
use crate::config::TilestampConfig;
use crate::output::write_bytes;

/// Execute the import command
pub fn run_import(config: &TilestampConfig, input: &Path) -> ExitCode {
    let json = match std::fs::read_to_string(input) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error: Cannot read '{}': {}", input.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let mut manager = match open_manager(config) {
        Ok(manager) => manager,
        Err(code) => return code,
    };

    match manager.import_json(&json) {
        Ok(report) => {
            println!("{}", report.status());
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => report_error(&e),
    }
}

/// Execute the export command
pub fn run_export(config: &TilestampConfig, output: Option<&Path>) -> ExitCode {
    let manager = match open_manager(config) {
        Ok(manager) => manager,
        Err(code) => return code,
    };

    let json = match manager.export_json() {
        Ok(json) => json,
        Err(e) => return report_error(&e),
    };

    match output {
        Some(path) => {
            if let Err(e) = write_bytes(path, json.as_bytes()) {
                eprintln!("Error: Failed to write '{}': {}", path.display(), e);
                return ExitCode::from(EXIT_ERROR);
            }
            println!("Exported {} template(s) to {}", manager.get_all_templates().len(), path.display());
        }
        None => println!("{}", json),
    }
    ExitCode::from(EXIT_SUCCESS)
}
