//! Template placement coordinates

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::TileGrid;

/// Reason a coordinate quadruple was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordsError {
    #[error("Coordinates need exactly 4 values (tile X, tile Y, pixel X, pixel Y), got {0}")]
    WrongLength(usize),
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error("Coordinates must be finite numbers")]
    NotFinite,
    #[error("Coordinates must not be negative")]
    Negative,
    #[error("Coordinates must be whole numbers")]
    NotInteger,
    #[error("Tile {axis} must be between 0 and {max}, got {value}")]
    TileOutOfRange { axis: char, value: u32, max: u32 },
    #[error("Pixel {axis} must be between 0 and {max}, got {value}", max = tile_size - 1)]
    PixelOutOfRange { axis: char, value: u32, tile_size: u32 },
}

/// `[tileX, tileY, pixelX, pixelY]` of a template's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Coords(pub [u32; 4]);

impl Coords {
    pub fn new(tile_x: u32, tile_y: u32, pixel_x: u32, pixel_y: u32) -> Self {
        Self([tile_x, tile_y, pixel_x, pixel_y])
    }

    pub fn tile_x(&self) -> u32 {
        self.0[0]
    }

    pub fn tile_y(&self) -> u32 {
        self.0[1]
    }

    pub fn pixel_x(&self) -> u32 {
        self.0[2]
    }

    pub fn pixel_y(&self) -> u32 {
        self.0[3]
    }

    /// Build coordinates from untrusted numbers (UI input, JSON arrays).
    ///
    /// Every value must be finite, non-negative and integral.
    pub fn from_numbers(values: &[f64]) -> Result<Self, CoordsError> {
        if values.len() != 4 {
            return Err(CoordsError::WrongLength(values.len()));
        }
        let mut out = [0u32; 4];
        for (slot, &value) in out.iter_mut().zip(values) {
            if !value.is_finite() {
                return Err(CoordsError::NotFinite);
            }
            if value < 0.0 {
                return Err(CoordsError::Negative);
            }
            if value.fract() != 0.0 || value > u32::MAX as f64 {
                return Err(CoordsError::NotInteger);
            }
            *slot = value as u32;
        }
        Ok(Self(out))
    }

    /// Check the bounds imposed by the tile grid.
    pub fn validate(&self, grid: &TileGrid) -> Result<(), CoordsError> {
        for (axis, value) in [('X', self.tile_x()), ('Y', self.tile_y())] {
            if value > grid.max_tile_index {
                return Err(CoordsError::TileOutOfRange { axis, value, max: grid.max_tile_index });
            }
        }
        for (axis, value) in [('X', self.pixel_x()), ('Y', self.pixel_y())] {
            if value >= grid.tile_size {
                return Err(CoordsError::PixelOutOfRange { axis, value, tile_size: grid.tile_size });
            }
        }
        Ok(())
    }

    /// Global canvas pixel of the top-left corner.
    pub fn global_origin(&self, grid: &TileGrid) -> (u64, u64) {
        (grid.join(self.tile_x(), self.pixel_x()), grid.join(self.tile_y(), self.pixel_y()))
    }
}

impl fmt::Display for Coords {
    /// Comma-joined form used by the persisted document.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

impl FromStr for Coords {
    type Err = CoordsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|part| {
                let part = part.trim();
                part.parse::<f64>().map_err(|_| CoordsError::NotANumber(part.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_numbers(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_comma_joined() {
        let coords: Coords = "1, 2,30,40".parse().unwrap();
        assert_eq!(coords, Coords::new(1, 2, 30, 40));
        assert_eq!(coords.to_string(), "1,2,30,40");
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert_eq!("1,2,3".parse::<Coords>(), Err(CoordsError::WrongLength(3)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!("1,2,x,4".parse::<Coords>(), Err(CoordsError::NotANumber(_))));
    }

    #[test]
    fn test_from_numbers_rejects_bad_values() {
        assert_eq!(Coords::from_numbers(&[1.0, -1.0, 0.0, 0.0]), Err(CoordsError::Negative));
        assert_eq!(Coords::from_numbers(&[f64::NAN, 0.0, 0.0, 0.0]), Err(CoordsError::NotFinite));
        assert_eq!(Coords::from_numbers(&[0.5, 0.0, 0.0, 0.0]), Err(CoordsError::NotInteger));
    }

    #[test]
    fn test_validate_tile_bound() {
        let grid = TileGrid::default();
        assert!(Coords::new(2047, 2047, 999, 999).validate(&grid).is_ok());
        let err = Coords::new(2048, 0, 0, 0).validate(&grid).unwrap_err();
        assert_eq!(err, CoordsError::TileOutOfRange { axis: 'X', value: 2048, max: 2047 });
        assert_eq!(err.to_string(), "Tile X must be between 0 and 2047, got 2048");
    }

    #[test]
    fn test_validate_pixel_bound() {
        let grid = TileGrid::default();
        let err = Coords::new(0, 0, 0, 1000).validate(&grid).unwrap_err();
        assert_eq!(err.to_string(), "Pixel Y must be between 0 and 999, got 1000");
    }

    #[test]
    fn test_global_origin() {
        let grid = TileGrid::new(10, 3);
        assert_eq!(Coords::new(2, 3, 4, 5).global_origin(&grid), (24, 35));
    }
}
