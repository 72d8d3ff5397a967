//! Composite template keys and tile fragment keys
//!
//! Both key kinds travel as plain strings in the persisted document, so each
//! has a strict grammar, a `Display` form and a `FromStr` parser.

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

static COMPOSITE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(0|[1-9]\d*) (\S+)$").expect("composite key pattern is valid"));

static FRAGMENT_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}),(\d{4}),(\d+),(\d+)$").expect("fragment key pattern is valid")
});

/// A key string that does not follow its grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("'{0}' is not a template key (expected \"<sortID> <authorID>\")")]
    Composite(String),
    #[error("'{0}' is not a fragment key (expected \"TTTT,TTTT,px,py\")")]
    Fragment(String),
}

/// `"<sortID> <authorID>"`, the external handle of a template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeKey {
    pub sort_id: u32,
    pub author_id: String,
}

impl CompositeKey {
    pub fn new(sort_id: u32, author_id: impl Into<String>) -> Self {
        Self { sort_id, author_id: author_id.into() }
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.sort_id, self.author_id)
    }
}

impl FromStr for CompositeKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = COMPOSITE_KEY_RE.captures(s).ok_or_else(|| KeyError::Composite(s.to_string()))?;
        let sort_id = caps[1].parse().map_err(|_| KeyError::Composite(s.to_string()))?;
        Ok(Self { sort_id, author_id: caps[2].to_string() })
    }
}

/// Location of one fragment bitmap: the tile it belongs to and the tile-local
/// offset (in unscaled canvas pixels) of its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentKey {
    pub tile_x: u32,
    pub tile_y: u32,
    pub pixel_x: u32,
    pub pixel_y: u32,
}

impl FragmentKey {
    pub fn new(tile_x: u32, tile_y: u32, pixel_x: u32, pixel_y: u32) -> Self {
        Self { tile_x, tile_y, pixel_x, pixel_y }
    }

    /// Whether this fragment lives on the given tile.
    pub fn is_on_tile(&self, tile_x: u32, tile_y: u32) -> bool {
        self.tile_x == tile_x && self.tile_y == tile_y
    }
}

/// Zero-padded `"TTTT,TTTT,"` prefix shared by every fragment key on a tile.
pub fn tile_prefix(tile_x: u32, tile_y: u32) -> String {
    format!("{:04},{:04},", tile_x, tile_y)
}

impl fmt::Display for FragmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{},{}", tile_prefix(self.tile_x, self.tile_y), self.pixel_x, self.pixel_y)
    }
}

impl FromStr for FragmentKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = FRAGMENT_KEY_RE.captures(s).ok_or_else(|| KeyError::Fragment(s.to_string()))?;
        let field = |i: usize| caps[i].parse::<u32>().map_err(|_| KeyError::Fragment(s.to_string()));
        Ok(Self { tile_x: field(1)?, tile_y: field(2)?, pixel_x: field(3)?, pixel_y: field(4)? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_key_display_and_parse() {
        let key = CompositeKey::new(3, "$Z");
        assert_eq!(key.to_string(), "3 $Z");
        assert_eq!("3 $Z".parse::<CompositeKey>().unwrap(), key);
    }

    #[test]
    fn test_composite_key_rejects_bad_grammar() {
        assert!("three $Z".parse::<CompositeKey>().is_err());
        assert!("3".parse::<CompositeKey>().is_err());
        assert!("3 a b".parse::<CompositeKey>().is_err());
        assert!("-1 a".parse::<CompositeKey>().is_err());
    }

    #[test]
    fn test_composite_key_sort_id_is_canonical() {
        assert!("01 $".parse::<CompositeKey>().is_err());
        assert!("00 $".parse::<CompositeKey>().is_err());
        assert_eq!("0 $".parse::<CompositeKey>().unwrap(), CompositeKey::new(0, "$"));
        assert_eq!("10 $".parse::<CompositeKey>().unwrap(), CompositeKey::new(10, "$"));
    }

    #[test]
    fn test_fragment_key_is_zero_padded() {
        let key = FragmentKey::new(1, 23, 998, 7);
        assert_eq!(key.to_string(), "0001,0023,998,7");
        assert!(key.to_string().starts_with(&tile_prefix(1, 23)));
    }

    #[test]
    fn test_fragment_key_parse() {
        let key: FragmentKey = "0012,0340,5,6".parse().unwrap();
        assert_eq!(key, FragmentKey::new(12, 340, 5, 6));
        assert!(key.is_on_tile(12, 340));
    }

    #[test]
    fn test_fragment_key_requires_four_digit_tiles() {
        assert!("12,0340,5,6".parse::<FragmentKey>().is_err());
        assert!("0012,0340,5".parse::<FragmentKey>().is_err());
        assert!("0012,0340,-5,6".parse::<FragmentKey>().is_err());
    }

    #[test]
    fn test_prefix_does_not_collide_across_tiles() {
        // Tile (1, 2) must not match the prefix of tile (1, 20) or (11, 2)
        let prefix = tile_prefix(1, 2);
        assert!(!FragmentKey::new(1, 20, 0, 0).to_string().starts_with(&prefix));
        assert!(!FragmentKey::new(11, 2, 0, 0).to_string().starts_with(&prefix));
    }
}
