//! Store interfaces consumed by the assembly services.
//!
//! Each trait is one narrow capability so services depend only on what they
//! read or write, and tests can substitute fakes per capability.

use async_trait::async_trait;
use indexmap::IndexSet;
use lexblocks_core::{Block, Document, Rule, Template};

use crate::StoreError;

/// Read access to the current version of blocks.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Fetch a block by id.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no block has this id
    async fn get_block(&self, id: &str) -> Result<Block, StoreError>;
}

/// Read access to rules.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// All enabled rules, highest priority first.
    async fn list_enabled(&self) -> Result<Vec<Rule>, StoreError>;
}

/// Read access to templates.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Fetch a template by id.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no template has this id
    async fn get_template(&self, id: &str) -> Result<Template, StoreError>;
}

/// Bounded traversal over the block relationship graph.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Distinct ids within `max_depth` undirected hops of `block_id`, excluding
    /// `block_id` itself. An unknown block yields an empty set.
    async fn traverse(&self, block_id: &str, max_depth: u32) -> Result<IndexSet<String>, StoreError>;
}

/// Write access for assembled documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn save_document(&self, document: &Document) -> Result<(), StoreError>;
}
