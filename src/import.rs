//! Importing persisted documents into live templates
//!
//! Failures are contained to the smallest unit: a corrupt fragment drops
//! only that fragment, a template with an unusable key or coordinates drops
//! only that template. Only an unrecognized document identity refuses the
//! whole import.

use image::RgbaImage;
use rayon::prelude::*;
use std::collections::BTreeMap;

use crate::error::EngineError;
use crate::models::{CompositeKey, FragmentKey, Template, TileGrid};
use crate::output::image_from_base64;
use crate::persist::{ParsedDocument, TemplateDocument, TemplateRecord};
use crate::reconstruct::reconstruct_pixel_count;

/// Default pixel estimate per fragment when the count cannot be recovered.
pub const DEFAULT_HEURISTIC_PIXELS_PER_FRAGMENT: u64 = 100;

/// Outcome of one import, for status display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Keys that became live templates
    pub added: Vec<String>,
    /// Keys already present in the current document
    pub skipped_existing: Vec<String>,
    /// Keys dropped because the entry was unusable
    pub rejected: Vec<String>,
    /// Fragments that failed to decode across all added templates
    pub corrupt_fragments: usize,
}

impl ImportReport {
    pub fn status(&self) -> String {
        let mut message = format!("Imported {} template(s)", self.added.len());
        if !self.skipped_existing.is_empty() {
            message.push_str(&format!(", {} already present", self.skipped_existing.len()));
        }
        if !self.rejected.is_empty() {
            message.push_str(&format!(", {} rejected", self.rejected.len()));
        }
        if self.corrupt_fragments > 0 {
            message.push_str(&format!(", {} corrupt fragment(s) skipped", self.corrupt_fragments));
        }
        message
    }
}

/// Resolve a parsed document against the accepted identities.
///
/// Identity-less documents are stamped with `current_identity`; tagged
/// documents must name one of `accepted`.
pub fn accept_document(
    parsed: ParsedDocument,
    current_identity: &str,
    accepted: &[String],
) -> Result<TemplateDocument, EngineError> {
    let document = parsed.into_document(current_identity);
    if document.whoami != current_identity && !accepted.iter().any(|a| *a == document.whoami) {
        tracing::warn!("Refusing to import document written by '{}'", document.whoami);
        return Err(EngineError::IdentityMismatch(document.whoami));
    }
    Ok(document)
}

/// Settings that shape how records become templates.
#[derive(Debug, Clone, Copy)]
pub struct ImportSettings {
    pub grid: TileGrid,
    pub heuristic_pixels_per_fragment: u64,
}

/// Decode every fragment of a record in parallel, skipping bad ones.
fn decode_fragments(key: &str, record: &TemplateRecord) -> (BTreeMap<FragmentKey, RgbaImage>, usize) {
    let results: Vec<_> = record
        .tiles
        .par_iter()
        .map(|(fragment_key, payload)| {
            let parsed = fragment_key.parse::<FragmentKey>().map_err(|e| e.to_string())?;
            let bitmap = image_from_base64(payload).map_err(|e| e.to_string())?;
            Ok::<_, String>((parsed, bitmap))
        })
        .collect();

    let mut fragments = BTreeMap::new();
    let mut corrupt = 0;
    for result in results {
        match result {
            Ok((fragment_key, bitmap)) => {
                fragments.insert(fragment_key, bitmap);
            }
            Err(reason) => {
                corrupt += 1;
                tracing::warn!("Skipping fragment of template '{}': {}", key, reason);
            }
        }
    }
    (fragments, corrupt)
}

/// Build a live template from a stored record.
///
/// When the record has no trusted pixel count, the reconstructed count is
/// written back into the record. Returns the template and the number of
/// fragments that failed to decode, or the reason the record is unusable.
pub fn build_template(
    key: &str,
    record: &mut TemplateRecord,
    settings: &ImportSettings,
) -> Result<(Template, usize), String> {
    let composite: CompositeKey = key.parse().map_err(|e: crate::models::KeyError| e.to_string())?;
    let coords = record.parsed_coords().map_err(|e| format!("bad coordinates '{}': {}", record.coords, e))?;

    let (chunked, corrupt) = decode_fragments(key, record);

    let pixel_count = match record.pixel_count {
        Some(count) => count,
        None => match reconstruct_pixel_count(&chunked, &settings.grid) {
            Ok(count) => {
                record.pixel_count = Some(count);
                count
            }
            Err(e) => {
                let estimate = chunked.len() as u64 * settings.heuristic_pixels_per_fragment;
                tracing::warn!("Estimating pixel count of '{}' as {} ({})", key, estimate, e);
                estimate
            }
        },
    };

    let template = Template {
        display_name: record.name.clone(),
        sort_id: composite.sort_id,
        author_id: composite.author_id,
        coords,
        enabled: record.enabled,
        chunked,
        pixel_count,
    };
    Ok((template, corrupt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::chunk_image;
    use crate::models::Coords;
    use crate::output::image_to_base64;
    use image::Rgba;

    fn settings() -> ImportSettings {
        ImportSettings { grid: TileGrid::new(10, 3), heuristic_pixels_per_fragment: 100 }
    }

    fn record_for(image: &RgbaImage, coords: Coords) -> TemplateRecord {
        let chunked = chunk_image(image, coords, &settings().grid);
        TemplateRecord {
            name: "imported".to_string(),
            coords: coords.to_string(),
            enabled: true,
            tiles: chunked
                .tiles
                .iter()
                .map(|(k, v)| (k.to_string(), image_to_base64(v).unwrap()))
                .collect(),
            pixel_count: None,
        }
    }

    #[test]
    fn test_accept_current_and_alias_identities() {
        let aliases = vec!["OldName".to_string()];
        let current = ParsedDocument::Tagged(TemplateDocument::new("Tilestamp"));
        assert!(accept_document(current, "Tilestamp", &aliases).is_ok());
        let alias = ParsedDocument::Tagged(TemplateDocument::new("OldName"));
        assert!(accept_document(alias, "Tilestamp", &aliases).is_ok());
    }

    #[test]
    fn test_reject_foreign_identity() {
        let foreign = ParsedDocument::Tagged(TemplateDocument::new("SomeOtherTool"));
        let err = accept_document(foreign, "Tilestamp", &[]).unwrap_err();
        assert!(matches!(err, EngineError::IdentityMismatch(ref who) if who == "SomeOtherTool"));
    }

    #[test]
    fn test_untagged_document_gets_current_identity() {
        let doc = accept_document(ParsedDocument::Untagged(BTreeMap::new()), "Tilestamp", &[]).unwrap();
        assert_eq!(doc.whoami, "Tilestamp");
    }

    #[test]
    fn test_build_reconstructs_and_writes_back_count() {
        let image = RgbaImage::from_pixel(12, 3, Rgba([5, 5, 5, 255]));
        let mut record = record_for(&image, Coords::new(0, 0, 4, 0));

        let (template, corrupt) = build_template("2 #", &mut record, &settings()).unwrap();
        assert_eq!(corrupt, 0);
        assert_eq!(template.sort_id, 2);
        assert_eq!(template.author_id, "#");
        assert_eq!(template.pixel_count, 36);
        assert_eq!(record.pixel_count, Some(36));
    }

    #[test]
    fn test_build_trusts_stored_count() {
        let image = RgbaImage::from_pixel(2, 2, Rgba([5, 5, 5, 255]));
        let mut record = record_for(&image, Coords::default());
        record.pixel_count = Some(999);
        let (template, _) = build_template("0 !", &mut record, &settings()).unwrap();
        assert_eq!(template.pixel_count, 999);
    }

    #[test]
    fn test_corrupt_fragment_is_skipped_not_fatal() {
        let image = RgbaImage::from_pixel(12, 2, Rgba([5, 5, 5, 255]));
        let mut record = record_for(&image, Coords::new(0, 0, 4, 0));
        record.tiles.insert("0005,0005,0,0".to_string(), "!!!corrupt!!!".to_string());

        let (template, corrupt) = build_template("0 !", &mut record, &settings()).unwrap();
        assert_eq!(corrupt, 1);
        assert_eq!(template.chunked.len(), 2);
        assert_eq!(template.pixel_count, 24);
    }

    #[test]
    fn test_unshredded_fragment_falls_back_to_heuristic() {
        let mut record = TemplateRecord {
            name: "odd".to_string(),
            coords: "0,0,0,0".to_string(),
            enabled: true,
            tiles: BTreeMap::from([("0000,0000,0,0".to_string(), image_to_base64(&RgbaImage::new(4, 4)).unwrap())]),
            pixel_count: None,
        };
        let (template, _) = build_template("0 !", &mut record, &settings()).unwrap();
        assert_eq!(template.pixel_count, 100);
        assert_eq!(record.pixel_count, None, "estimates are not persisted");
    }

    #[test]
    fn test_bad_key_or_coords_rejects_template() {
        let mut record = record_for(&RgbaImage::new(1, 1), Coords::default());
        assert!(build_template("no-space", &mut record, &settings()).is_err());
        record.coords = "1,2".to_string();
        assert!(build_template("0 !", &mut record, &settings()).is_err());
    }

    #[test]
    fn test_report_status() {
        let report = ImportReport {
            added: vec!["0 !".to_string()],
            skipped_existing: vec!["1 !".to_string()],
            rejected: vec![],
            corrupt_fragments: 2,
        };
        assert_eq!(report.status(), "Imported 1 template(s), 1 already present, 2 corrupt fragment(s) skipped");
    }
}
