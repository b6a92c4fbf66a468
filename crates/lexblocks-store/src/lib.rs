//! Storage layer: store interfaces, the in-memory store, catalog import and
//! statute text ingestion.

mod error;
pub use error::StoreError;

pub mod catalog;
pub mod ingest;
pub mod memory;
pub mod ports;

pub use catalog::{Catalog, CatalogSummary};
pub use ingest::{detect_law, parse_file, StatuteParser};
pub use memory::{MemoryStore, VersionHistory};
pub use ports::{BlockStore, DocumentStore, GraphStore, RuleStore, TemplateStore};
