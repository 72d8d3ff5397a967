//! Persisted template collection document
//!
//! ```json
//! {
//!   "whoami": "Tilestamp",
//!   "scriptVersion": "0.1.0",
//!   "schemaVersion": "1.0.0",
//!   "templates": {
//!     "0 $Z": {
//!       "name": "Castle",
//!       "coords": "12,40,310,95",
//!       "enabled": true,
//!       "tiles": { "0012,0040,310,95": "<base64 png>" },
//!       "pixelCount": 1234
//!     }
//!   }
//! }
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::{Coords, Template};
use crate::output::image_to_base64;

/// Schema version written into new documents.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Error parsing a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Not a template document: {0}")]
    Malformed(String),
}

/// Root of the persisted collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDocument {
    /// Identity of the tool that wrote the document
    pub whoami: String,
    #[serde(rename = "scriptVersion", default)]
    pub script_version: String,
    #[serde(rename = "schemaVersion", default = "default_schema_version")]
    pub schema_version: String,
    /// Keyed by composite key
    pub templates: BTreeMap<String, TemplateRecord>,
}

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

impl TemplateDocument {
    /// An empty collection stamped with the given identity.
    pub fn new(whoami: impl Into<String>) -> Self {
        Self {
            whoami: whoami.into(),
            script_version: env!("CARGO_PKG_VERSION").to_string(),
            schema_version: default_schema_version(),
            templates: BTreeMap::new(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// One template as stored in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRecord {
    #[serde(default)]
    pub name: String,
    /// Comma-joined `tileX,tileY,pixelX,pixelY`
    #[serde(deserialize_with = "deserialize_coords")]
    pub coords: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Fragment key to base64 PNG
    #[serde(default)]
    pub tiles: BTreeMap<String, String>,
    #[serde(
        rename = "pixelCount",
        default,
        deserialize_with = "deserialize_pixel_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub pixel_count: Option<u64>,
}

fn default_enabled() -> bool {
    true
}

impl TemplateRecord {
    /// Encode a template's fragments for storage.
    pub fn from_template(template: &Template) -> Result<Self, image::ImageError> {
        let tiles = template
            .chunked
            .iter()
            .map(|(key, bitmap)| Ok((key.to_string(), image_to_base64(bitmap)?)))
            .collect::<Result<BTreeMap<_, _>, image::ImageError>>()?;
        Ok(Self {
            name: template.display_name.clone(),
            coords: template.coords.to_string(),
            enabled: template.enabled,
            tiles,
            pixel_count: Some(template.pixel_count),
        })
    }

    pub fn parsed_coords(&self) -> Result<Coords, crate::models::CoordsError> {
        self.coords.parse()
    }
}

/// Accept `"1,2,3,4"` as well as the older `[1, 2, 3, 4]` array form.
fn deserialize_coords<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawCoords {
        Text(String),
        List(Vec<serde_json::Number>),
    }

    Ok(match RawCoords::deserialize(deserializer)? {
        RawCoords::Text(text) => text,
        RawCoords::List(values) => values.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(","),
    })
}

/// Only a non-negative whole number counts as a trusted pixel count;
/// anything else is treated as absent.
fn deserialize_pixel_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(|v| {
        v.as_u64().or_else(|| v.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))
    }))
}

/// Result of the two-shape document parse.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedDocument {
    /// Carries a `whoami` identity
    Tagged(TemplateDocument),
    /// A bare `templates` map without identity
    Untagged(BTreeMap<String, TemplateRecord>),
}

#[derive(Deserialize)]
struct UntaggedDocument {
    templates: BTreeMap<String, TemplateRecord>,
}

/// Parse a document, trying the strict schema first and then the
/// identity-less `templates` shape.
pub fn parse_document(json: &str) -> Result<ParsedDocument, DocumentError> {
    let value: Value = serde_json::from_str(json)?;
    parse_document_value(value)
}

/// Same as [`parse_document`] for an already parsed JSON value.
pub fn parse_document_value(value: Value) -> Result<ParsedDocument, DocumentError> {
    let strict_err = match TemplateDocument::deserialize(&value) {
        Ok(doc) => return Ok(ParsedDocument::Tagged(doc)),
        Err(e) => e,
    };

    let has_identity = value.get("whoami").is_some();
    if !has_identity {
        if let Ok(doc) = UntaggedDocument::deserialize(&value) {
            return Ok(ParsedDocument::Untagged(doc.templates));
        }
    }

    Err(DocumentError::Malformed(strict_err.to_string()))
}

impl ParsedDocument {
    /// Turn either shape into a full document, injecting `identity` when absent.
    pub fn into_document(self, identity: &str) -> TemplateDocument {
        match self {
            ParsedDocument::Tagged(doc) => doc,
            ParsedDocument::Untagged(templates) => {
                TemplateDocument { templates, ..TemplateDocument::new(identity) }
            }
        }
    }
}
