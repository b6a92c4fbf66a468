//! JSON catalog import.
//!
//! A catalog bundles blocks, rules and templates in one file:
//!
//! ```json
//! { "blocks": [...], "rules": [...], "templates": [...] }
//! ```
//!
//! Every key is optional.

use std::path::Path;

use lexblocks_core::{Block, Rule, Template};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{MemoryStore, StoreError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub templates: Vec<Template>,
}

impl Catalog {
    /// Read and parse a catalog file.
    pub fn read(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Err(StoreError::CatalogNotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write the catalog as pretty-printed JSON.
    pub fn write(&self, path: &Path) -> Result<(), StoreError> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Counts from one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogSummary {
    pub blocks: usize,
    pub rules: usize,
    pub templates: usize,
    /// Entries whose id already existed.
    pub skipped: usize,
}

impl MemoryStore {
    /// Import a parsed catalog. Existing ids are skipped with a warning.
    pub fn import(&self, catalog: Catalog) -> Result<CatalogSummary, StoreError> {
        let mut summary = CatalogSummary::default();

        let offered = catalog.blocks.len();
        let skipped_blocks = self.create_blocks(catalog.blocks)?;
        for id in &skipped_blocks {
            warn!(block_id = %id, "block exists, skipping");
        }
        summary.blocks = offered - skipped_blocks.len();
        summary.skipped += skipped_blocks.len();

        for rule in catalog.rules {
            match self.create_rule(rule) {
                Ok(()) => summary.rules += 1,
                Err(StoreError::AlreadyExists { id, .. }) => {
                    warn!(rule_id = %id, "rule exists, skipping");
                    summary.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        for template in catalog.templates {
            match self.create_template(template) {
                Ok(()) => summary.templates += 1,
                Err(StoreError::AlreadyExists { id, .. }) => {
                    warn!(template_id = %id, "template exists, skipping");
                    summary.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            blocks = summary.blocks,
            rules = summary.rules,
            templates = summary.templates,
            skipped = summary.skipped,
            "catalog imported"
        );
        Ok(summary)
    }

    /// Read a catalog file and import it.
    pub fn load_catalog(&self, path: &Path) -> Result<CatalogSummary, StoreError> {
        self.import(Catalog::read(path)?)
    }

    /// Everything the store holds except documents. Blocks come in citation order.
    pub fn export(&self) -> Result<Catalog, StoreError> {
        Ok(Catalog {
            blocks: self.list_blocks()?,
            rules: self.list_rules()?,
            templates: self.list_templates()?,
        })
    }

    /// A new store populated from a catalog file.
    pub fn from_catalog_file(path: &Path) -> Result<Self, StoreError> {
        let store = Self::new();
        store.load_catalog(path)?;
        Ok(store)
    }
}
