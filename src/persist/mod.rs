//! Persistence: the JSON document codec and its storage backends

mod document;
mod store;

pub use document::{
    parse_document, parse_document_value, DocumentError, ParsedDocument, TemplateDocument, TemplateRecord,
    SCHEMA_VERSION,
};
pub use store::{FileStore, MemoryStore, StorageChain, StoreError, TemplateStore};
