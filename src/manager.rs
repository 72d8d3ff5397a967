//! Template manager - owns the template collection and its persisted mirror
//!
//! Every mutating operation updates the live [`Template`] list and the
//! [`TemplateDocument`] together, then writes the whole document through the
//! [`StorageChain`]. Mutations take `&mut self`, so a manager never runs two
//! of them at once; compositing only needs `&self`.

use std::collections::BTreeMap;

use crate::author::encode_author_id;
use crate::chunker::{chunk_bytes, chunk_image};
use crate::compositor::{draw_templates_on_tile, TileComposite};
use crate::config::{IdentityConfig, TilestampConfig};
use crate::error::{EngineError, Result};
use crate::import::{accept_document, build_template, ImportReport, ImportSettings};
use crate::models::{validate_name, CompositeKey, Coords, Template, TemplateSummary, TileGrid};
use crate::persist::{parse_document, StorageChain, TemplateDocument, TemplateRecord};
use crate::reconstruct::reassemble;
use crate::status::format_count;

/// Root coordinator for template state.
#[derive(Debug)]
pub struct TemplateManager {
    grid: TileGrid,
    identity: IdentityConfig,
    heuristic_pixels_per_fragment: u64,
    templates: Vec<Template>,
    document: Option<TemplateDocument>,
    storage: StorageChain,
    templates_should_be_drawn: bool,
    next_sort_id: u32,
}

impl TemplateManager {
    /// Create an empty manager. Nothing is read from storage.
    pub fn new(config: &TilestampConfig, storage: StorageChain) -> Self {
        Self {
            grid: config.grid,
            identity: config.identity.clone(),
            heuristic_pixels_per_fragment: config.import_config.heuristic_pixels_per_fragment,
            templates: Vec::new(),
            document: None,
            storage,
            templates_should_be_drawn: true,
            next_sort_id: 0,
        }
    }

    /// Create a manager and import whatever the storage chain holds.
    ///
    /// The document is only written back when loading changed it, or when it
    /// came from a fallback store and the primary needs a copy.
    pub fn load(config: &TilestampConfig, storage: StorageChain) -> Result<Self> {
        let mut manager = Self::new(config, storage);
        if let Some((json, from_fallback)) = manager.storage.read_with_source()? {
            let report = manager.merge_json(&json)?;
            tracing::info!("Loaded stored templates: {}", report.status());
            let current = manager.document_mut().to_json_pretty()?;
            if from_fallback || current != json {
                manager.storage.write(&current)?;
            }
        }
        Ok(manager)
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// The persisted mirror, if anything has been created or imported.
    pub fn document(&self) -> Option<&TemplateDocument> {
        self.document.as_ref()
    }

    pub fn templates_should_be_drawn(&self) -> bool {
        self.templates_should_be_drawn
    }

    /// Master switch; when off, tiles pass through untouched.
    pub fn set_templates_should_be_drawn(&mut self, draw: bool) {
        self.templates_should_be_drawn = draw;
    }

    fn document_mut(&mut self) -> &mut TemplateDocument {
        let identity = &self.identity.name;
        self.document.get_or_insert_with(|| TemplateDocument::new(identity.clone()))
    }

    /// Serialize the full document and write it to every backend.
    fn persist(&mut self) -> Result<()> {
        let json = self.document_mut().to_json_pretty()?;
        self.storage.write(&json)?;
        Ok(())
    }

    /// Next unused sort id: at least the document size, and above any id in use.
    fn allocate_sort_id(&mut self) -> u32 {
        let count = self.document.as_ref().map_or(0, |doc| doc.templates.len()) as u32;
        let live_max = self.templates.iter().map(|t| t.sort_id + 1).max().unwrap_or(0);
        let stored_max = self
            .document
            .iter()
            .flat_map(|doc| doc.templates.keys())
            .filter_map(|key| key.parse::<CompositeKey>().ok())
            .map(|key| key.sort_id + 1)
            .max()
            .unwrap_or(0);
        let sort_id = count.max(live_max).max(stored_max).max(self.next_sort_id);
        self.next_sort_id = sort_id + 1;
        sort_id
    }

    fn parse_key(key: &str) -> Result<CompositeKey> {
        Ok(key.parse::<CompositeKey>()?)
    }

    fn position(&self, key: &CompositeKey) -> Option<usize> {
        self.templates.iter().position(|t| t.matches_key(key))
    }

    /// Create a template from encoded image bytes placed at `coords`.
    ///
    /// Returns a status message with the formatted pixel count.
    pub fn create_template(&mut self, image_bytes: &[u8], name: &str, coords: Coords) -> Result<String> {
        validate_name(name).map_err(EngineError::Validation)?;
        coords.validate(&self.grid)?;

        let chunked = chunk_bytes(image_bytes, coords, &self.grid)?;
        let sort_id = self.allocate_sort_id();
        let template = Template {
            display_name: name.to_string(),
            sort_id,
            author_id: encode_author_id(self.identity.user_id),
            coords,
            enabled: true,
            chunked: chunked.tiles,
            pixel_count: chunked.total_pixel_count,
        };

        let key = template.key().to_string();
        let record = TemplateRecord::from_template(&template)?;
        self.document_mut().templates.insert(key.clone(), record);
        self.templates.push(template);
        self.persist()?;

        let status = format!(
            "Template '{}' created at {} ({})! Total pixels: {}",
            name,
            coords,
            key,
            format_count(chunked.total_pixel_count)
        );
        tracing::info!("{}", status);
        Ok(status)
    }

    /// Remove a template. Unknown keys are a no-op.
    ///
    /// Stored entries whose key does not parse (kept from an import) can
    /// still be removed by their exact key.
    pub fn delete_template(&mut self, key: &str) -> Result<()> {
        let removed_doc = self.document_mut().templates.remove(key).is_some();
        let parsed = match Self::parse_key(key) {
            Ok(parsed) => parsed,
            Err(_) if removed_doc => {
                tracing::info!("Deleted stored entry {}", key);
                return self.persist();
            }
            Err(e) => return Err(e),
        };
        let before = self.templates.len();
        self.templates.retain(|t| !t.matches_key(&parsed));

        if removed_doc || self.templates.len() != before {
            tracing::info!("Deleted template {}", key);
        }
        self.persist()
    }

    fn set_enabled(&mut self, key: &str, enabled: bool) -> Result<()> {
        let in_doc = match self.document_mut().templates.get_mut(key) {
            Some(record) => {
                record.enabled = enabled;
                true
            }
            None => false,
        };
        let index = match key.parse::<CompositeKey>() {
            Ok(parsed) => self.position(&parsed),
            Err(e) if !in_doc => return Err(e.into()),
            Err(_) => None,
        };
        if let Some(index) = index {
            self.templates[index].enabled = enabled;
        }
        if !in_doc && index.is_none() {
            return Err(EngineError::UnknownTemplate(key.to_string()));
        }
        Ok(())
    }

    /// Enable or disable one template.
    pub fn toggle_template(&mut self, key: &str, enabled: bool) -> Result<()> {
        self.set_enabled(key, enabled)?;
        tracing::info!("{} template {}", if enabled { "Enabled" } else { "Disabled" }, key);
        self.persist()
    }

    /// Enable or disable every template, persisting once.
    ///
    /// Returns how many templates were changed.
    pub fn set_all_templates_enabled(&mut self, enabled: bool) -> Result<usize> {
        let mut keys: Vec<String> = self.templates.iter().map(|t| t.key().to_string()).collect();
        if let Some(doc) = &self.document {
            keys.extend(doc.templates.keys().cloned());
        }
        keys.sort();
        keys.dedup();

        for key in &keys {
            self.set_enabled(key, enabled)?;
        }
        self.persist()?;
        Ok(keys.len())
    }

    /// Rename a template. Names must be non-empty and at most 100 characters.
    pub fn update_template_name(&mut self, key: &str, new_name: &str) -> Result<String> {
        let parsed = Self::parse_key(key)?;
        validate_name(new_name).map_err(EngineError::Validation)?;

        let index = self.position(&parsed);
        let in_doc = self.document.as_ref().is_some_and(|doc| doc.templates.contains_key(key));
        if index.is_none() && !in_doc {
            return Err(EngineError::UnknownTemplate(key.to_string()));
        }

        if let Some(index) = index {
            self.templates[index].display_name = new_name.to_string();
        }
        if let Some(record) = self.document_mut().templates.get_mut(key) {
            record.name = new_name.to_string();
        }
        self.persist()?;
        Ok(format!("Template {} renamed to '{}'", key, new_name))
    }

    /// Move a template. `new_coords` is untrusted input; it must hold four
    /// finite, non-negative whole numbers inside the grid bounds.
    ///
    /// Fragment keys embed tile indices, so the template is reassembled from
    /// its fragments and chunked again at the new position.
    pub fn update_template_coordinates(&mut self, key: &str, new_coords: &[f64]) -> Result<String> {
        let parsed = Self::parse_key(key)?;
        let coords = Coords::from_numbers(new_coords)?;
        coords.validate(&self.grid)?;

        let index = self.position(&parsed).ok_or_else(|| EngineError::UnknownTemplate(key.to_string()))?;
        let template = &self.templates[index];
        let image = reassemble(&template.chunked, template.coords, &self.grid)
            .map_err(|e| EngineError::Validation(format!("Cannot move template {}: {}", key, e)))?;
        let chunked = chunk_image(&image, coords, &self.grid);

        let template = &mut self.templates[index];
        template.coords = coords;
        template.chunked = chunked.tiles;
        template.pixel_count = chunked.total_pixel_count;
        let record = TemplateRecord::from_template(template)?;
        self.document_mut().templates.insert(key.to_string(), record);
        self.persist()?;

        Ok(format!("Template {} moved to {}", key, coords))
    }

    /// Snapshot of every known template, ordered by sort id.
    ///
    /// Pixel counts come from the live template when one exists.
    pub fn get_all_templates(&self) -> Vec<TemplateSummary> {
        let mut summaries: BTreeMap<(u32, String), TemplateSummary> = BTreeMap::new();

        if let Some(doc) = &self.document {
            for (key, record) in &doc.templates {
                let Ok(parsed) = key.parse::<CompositeKey>() else { continue };
                let coords = record.parsed_coords().map(|c| c.0).unwrap_or_default();
                let live = self.position(&parsed).map(|i| &self.templates[i]);
                summaries.insert(
                    (parsed.sort_id, parsed.author_id.clone()),
                    TemplateSummary {
                        key: key.clone(),
                        name: record.name.clone(),
                        coords,
                        enabled: record.enabled,
                        pixel_count: live.map(|t| t.pixel_count).or(record.pixel_count),
                    },
                );
            }
        }

        for template in &self.templates {
            summaries.entry((template.sort_id, template.author_id.clone())).or_insert_with(|| TemplateSummary {
                key: template.key().to_string(),
                name: template.display_name.clone(),
                coords: template.coords.0,
                enabled: template.enabled,
                pixel_count: Some(template.pixel_count),
            });
        }

        summaries.into_values().collect()
    }

    /// Import a document. Additive and first-wins: keys already present are
    /// left untouched. A document from an unrecognized tool is refused
    /// without changing anything.
    pub fn import_json(&mut self, json: &str) -> Result<ImportReport> {
        let report = self.merge_json(json)?;
        self.persist()?;
        Ok(report)
    }

    /// Merge a document into memory without persisting.
    ///
    /// Records that cannot become live templates are still carried into the
    /// document unchanged, so writing it back never loses stored data.
    fn merge_json(&mut self, json: &str) -> Result<ImportReport> {
        let parsed = parse_document(json)?;
        let mut incoming = accept_document(parsed, &self.identity.name, &self.identity.aliases)?;
        let settings =
            ImportSettings { grid: self.grid, heuristic_pixels_per_fragment: self.heuristic_pixels_per_fragment };

        let mut report = ImportReport::default();
        let mut accepted: BTreeMap<String, TemplateRecord> = BTreeMap::new();
        let current = self.document.as_ref();

        for (key, mut record) in std::mem::take(&mut incoming.templates) {
            if current.is_some_and(|doc| doc.templates.contains_key(&key)) {
                report.skipped_existing.push(key);
                continue;
            }
            match build_template(&key, &mut record, &settings) {
                Ok((template, corrupt)) => {
                    report.corrupt_fragments += corrupt;
                    report.added.push(key.clone());
                    self.templates.push(template);
                    accepted.insert(key, record);
                }
                Err(reason) => {
                    tracing::warn!("Skipping template '{}': {}", key, reason);
                    report.rejected.push(key.clone());
                    accepted.insert(key, record);
                }
            }
        }

        match &mut self.document {
            Some(doc) => doc.templates.extend(accepted),
            None => self.document = Some(TemplateDocument { templates: accepted, ..incoming }),
        }

        tracing::info!("{}", report.status());
        Ok(report)
    }

    /// The current document as pretty-printed JSON.
    pub fn export_json(&self) -> Result<String> {
        match &self.document {
            Some(doc) => Ok(doc.to_json_pretty()?),
            None => Ok(TemplateDocument::new(self.identity.name.clone()).to_json_pretty()?),
        }
    }

    /// Draw every enabled template fragment for tile `(tile_x, tile_y)` over
    /// the live tile image.
    pub fn draw_template_on_tile(&self, tile_bytes: &[u8], tile: (u32, u32)) -> Result<TileComposite> {
        if !self.templates_should_be_drawn {
            return Ok(TileComposite { bytes: tile_bytes.to_vec(), templates_drawn: 0, pixel_count: 0 });
        }
        let composite = draw_templates_on_tile(&self.templates, tile_bytes, tile, &self.grid)?;
        tracing::info!("{}", composite.status());
        Ok(composite)
    }
}
