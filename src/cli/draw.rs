//! CLI dispatch for the `tstamp draw` command.
//!
//! Reads a live tile image, composites the enabled templates over it and
//! writes the upscaled result.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use super::{open_manager, report_error, EXIT_ERROR, EXIT_SUCCESS};
use crate::config::TilestampConfig;
use crate::output::write_bytes;

/// Parse `tileX,tileY` for the `--tile` flag.
pub fn parse_tile(s: &str) -> Result<(u32, u32), String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(format!("Invalid tile '{}': expected tileX,tileY", s));
    }
    let x = parts[0].parse::<u32>().map_err(|_| format!("Invalid tile x '{}'", parts[0]))?;
    let y = parts[1].parse::<u32>().map_err(|_| format!("Invalid tile y '{}'", parts[1]))?;
    Ok((x, y))
}

/// `tile.png` -> `tile_overlay.png`, keeping the input extension.
fn default_output(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let ext = input.extension().map(|e| e.to_string_lossy().to_string()).unwrap_or_else(|| "png".to_string());
    input.parent().unwrap_or(Path::new(".")).join(format!("{}_overlay.{}", stem, ext))
}

/// Execute the draw command.
pub fn run_draw(
    config: &TilestampConfig,
    input: &Path,
    tile: (u32, u32),
    output: Option<&Path>,
    no_templates: bool,
) -> ExitCode {
    let tile_bytes = match std::fs::read(input) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error: Cannot read '{}': {}", input.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let mut manager = match open_manager(config) {
        Ok(manager) => manager,
        Err(code) => return code,
    };
    if no_templates {
        manager.set_templates_should_be_drawn(false);
    }

    let composite = match manager.draw_template_on_tile(&tile_bytes, tile) {
        Ok(composite) => composite,
        Err(e) => return report_error(&e),
    };

    let output_path = output.map(Path::to_path_buf).unwrap_or_else(|| default_output(input));
    if let Err(e) = write_bytes(&output_path, &composite.bytes) {
        eprintln!("Error: Failed to write '{}': {}", output_path.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }

    println!("{}", composite.status());
    println!("Saved: {}", output_path.display());
    ExitCode::from(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tile() {
        assert_eq!(parse_tile("3,4"), Ok((3, 4)));
        assert_eq!(parse_tile(" 0 , 2047 "), Ok((0, 2047)));
        assert!(parse_tile("3").is_err());
        assert!(parse_tile("3,4,5").is_err());
        assert!(parse_tile("-1,4").is_err());
    }

    #[test]
    fn test_default_output_keeps_extension() {
        assert_eq!(default_output(Path::new("tiles/12_7.png")), PathBuf::from("tiles/12_7_overlay.png"));
        assert_eq!(default_output(Path::new("tile")), PathBuf::from("tile_overlay.png"));
    }
}
