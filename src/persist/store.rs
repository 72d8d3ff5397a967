//! Storage backends for the serialized document
//!
//! The document is written to an ordered chain of backends: the primary
//! store is scoped to the tool's identity, the fallbacks use fixed keys. On
//! startup the first non-empty backend wins, which recovers the collection
//! when the identity (and so the primary location) changes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Error reading or writing a backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Storage backend '{0}' is unavailable")]
    Unavailable(String),
}

/// A place a serialized document can be kept.
pub trait TemplateStore {
    /// Short label used in log messages.
    fn name(&self) -> &str;

    /// The stored document, or `None` when nothing has been written yet.
    fn read(&self) -> Result<Option<String>, StoreError>;

    fn write(&self, json: &str) -> Result<(), StoreError>;
}

/// JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    label: String,
    path: PathBuf,
}

impl FileStore {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self { label: label.into(), path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io { path: self.path.clone(), source }
    }
}

impl TemplateStore for FileStore {
    fn name(&self) -> &str {
        &self.label
    }

    fn read(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(None),
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_err(e)),
        }
    }

    fn write(&self, json: &str) -> Result<(), StoreError> {
        crate::output::write_bytes(&self.path, json.as_bytes()).map_err(|e| self.io_err(e))
    }
}

/// In-process store. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    label: String,
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into(), slot: Arc::default() }
    }

    /// Store pre-filled with a document.
    pub fn with_contents(label: impl Into<String>, json: impl Into<String>) -> Self {
        let store = Self::new(label);
        if let Ok(mut slot) = store.slot.lock() {
            *slot = Some(json.into());
        }
        store
    }

    /// Current contents, for inspection.
    pub fn contents(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl TemplateStore for MemoryStore {
    fn name(&self) -> &str {
        &self.label
    }

    fn read(&self) -> Result<Option<String>, StoreError> {
        let slot = self.slot.lock().map_err(|_| StoreError::Unavailable(self.label.clone()))?;
        Ok(slot.clone())
    }

    fn write(&self, json: &str) -> Result<(), StoreError> {
        let mut slot = self.slot.lock().map_err(|_| StoreError::Unavailable(self.label.clone()))?;
        *slot = Some(json.to_string());
        Ok(())
    }
}

/// Primary store plus best-effort fallbacks.
pub struct StorageChain {
    primary: Box<dyn TemplateStore>,
    fallbacks: Vec<Box<dyn TemplateStore>>,
}

impl StorageChain {
    pub fn new(primary: Box<dyn TemplateStore>) -> Self {
        Self { primary, fallbacks: Vec::new() }
    }

    pub fn with_fallback(mut self, fallback: Box<dyn TemplateStore>) -> Self {
        self.fallbacks.push(fallback);
        self
    }

    /// A chain that keeps everything in memory and shares nothing.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new("memory")))
    }

    fn backends(&self) -> impl Iterator<Item = &(dyn TemplateStore + 'static)> {
        std::iter::once(self.primary.as_ref()).chain(self.fallbacks.iter().map(|b| b.as_ref()))
    }

    /// Contents of the first backend holding a document.
    ///
    /// A failing primary is an error; failing fallbacks are skipped.
    pub fn read(&self) -> Result<Option<String>, StoreError> {
        Ok(self.read_with_source()?.map(|(json, _)| json))
    }

    /// Same as [`read`](Self::read), also telling whether a fallback
    /// supplied the document.
    pub fn read_with_source(&self) -> Result<Option<(String, bool)>, StoreError> {
        for (index, backend) in self.backends().enumerate() {
            match backend.read() {
                Ok(Some(json)) => {
                    if index > 0 {
                        tracing::info!("Recovered templates from fallback store '{}'", backend.name());
                    }
                    return Ok(Some((json, index > 0)));
                }
                Ok(None) => {}
                Err(e) if index == 0 => return Err(e),
                Err(e) => tracing::warn!("Skipping fallback store '{}': {}", backend.name(), e),
            }
        }
        Ok(None)
    }

    /// Write to every backend. Only a primary failure is returned.
    pub fn write(&self, json: &str) -> Result<(), StoreError> {
        self.primary.write(json)?;
        for fallback in &self.fallbacks {
            if let Err(e) = fallback.write(json) {
                tracing::warn!("Failed to write fallback store '{}': {}", fallback.name(), e);
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for StorageChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.backends().map(|b| b.name()).collect();
        f.debug_struct("StorageChain").field("backends", &names).finish()
    }
}
