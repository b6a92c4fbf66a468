//! In-memory implementation of every store interface.
//!
//! `MemoryStore` keeps blocks, rules, templates, documents, the relationship
//! graph and block version history behind one lock. It backs the CLI (loaded
//! from a JSON catalog) and the service tests.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use indexmap::{IndexMap, IndexSet};
use lexblocks_core::{
    Block, BlockGraph, BlockRelationships, BlockUpdate, BlockVersion, Document, DocumentStatus,
    Rule, Template, VersionDiff,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::ports::{BlockStore, DocumentStore, GraphStore, RuleStore, TemplateStore};
use crate::StoreError;

#[derive(Default)]
struct Inner {
    blocks: IndexMap<String, Block>,
    rules: IndexMap<String, Rule>,
    templates: IndexMap<String, Template>,
    documents: IndexMap<String, Document>,
    graph: BlockGraph,
    /// block_id → versions, oldest first.
    versions: HashMap<String, Vec<BlockVersion>>,
}

impl Inner {
    fn record_version(&mut self, block: &Block, summary: Option<String>) -> BlockVersion {
        let history = self.versions.entry(block.id.clone()).or_default();
        for v in history.iter_mut() {
            v.is_current = false;
        }
        let version = BlockVersion::snapshot(block, summary);
        history.push(version.clone());
        version
    }
}

/// Version history of one block, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct VersionHistory {
    pub block_id: String,
    pub total_versions: usize,
    pub current_version: u32,
    pub versions: Vec<BlockVersion>,
}

/// Thread-safe in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|e| StoreError::Other(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|e| StoreError::Other(format!("lock poisoned: {e}")))
    }

    // ── Blocks ──

    /// Store a new block, add it to the graph and record version 1.
    ///
    /// Relationship targets that do not exist yet get no edge.
    pub fn create_block(&self, block: Block) -> Result<Block, StoreError> {
        let mut inner = self.write()?;
        if inner.blocks.contains_key(&block.id) {
            return Err(StoreError::AlreadyExists {
                kind: "block",
                id: block.id,
            });
        }
        inner.graph.add_node(&block.id);
        let edges = inner.graph.link(&block);
        inner.record_version(&block, Some("Initial version".to_string()));
        debug!(block_id = %block.id, edges, "block created");
        inner.blocks.insert(block.id.clone(), block.clone());
        Ok(block)
    }

    /// Register a batch of blocks: all nodes first, then all edges, so edge
    /// creation does not depend on input order. Existing ids are skipped.
    ///
    /// Returns the ids that were skipped.
    pub fn create_blocks(&self, blocks: Vec<Block>) -> Result<Vec<String>, StoreError> {
        let mut inner = self.write()?;
        let mut skipped = Vec::new();
        let mut fresh = Vec::with_capacity(blocks.len());
        for block in blocks {
            if inner.blocks.contains_key(&block.id) || fresh.iter().any(|b: &Block| b.id == block.id) {
                skipped.push(block.id);
                continue;
            }
            inner.graph.add_node(&block.id);
            fresh.push(block);
        }
        for block in &fresh {
            inner.graph.link(block);
        }
        for block in fresh {
            inner.record_version(&block, Some("Initial version".to_string()));
            inner.blocks.insert(block.id.clone(), block);
        }
        debug!(
            nodes = inner.graph.node_count(),
            edges = inner.graph.edge_count(),
            skipped = skipped.len(),
            "block batch registered"
        );
        Ok(skipped)
    }

    /// Apply a partial update, bump the version and record it.
    ///
    /// An empty update returns the current block unchanged.
    pub fn update_block(
        &self,
        id: &str,
        update: BlockUpdate,
        change_summary: Option<String>,
    ) -> Result<Block, StoreError> {
        let mut inner = self.write()?;
        let mut block = inner
            .blocks
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("block", id))?;
        if update.is_empty() {
            return Ok(block);
        }

        let relinks = update.relationships.is_some();
        block.apply(update);
        block.version += 1;
        block.updated_at = Utc::now();

        if relinks {
            inner.graph.unlink_outgoing(id);
            inner.graph.link(&block);
        }
        inner.record_version(&block, change_summary);
        inner.blocks.insert(id.to_string(), block.clone());
        debug!(block_id = %id, version = block.version, "block updated");
        Ok(block)
    }

    /// Delete a block, its graph node with every incident edge, and its versions.
    pub fn delete_block(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if inner.blocks.shift_remove(id).is_none() {
            return Err(StoreError::not_found("block", id));
        }
        inner.graph.remove_node(id);
        inner.versions.remove(id);
        debug!(block_id = %id, "block deleted");
        Ok(())
    }

    /// All blocks ordered by source, then citation, then id.
    pub fn list_blocks(&self) -> Result<Vec<Block>, StoreError> {
        let inner = self.read()?;
        let mut blocks: Vec<Block> = inner.blocks.values().cloned().collect();
        blocks.sort_by_cached_key(|b| (b.source.clone(), b.sort_key(), b.id.clone()));
        Ok(blocks)
    }

    pub fn block_count(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.blocks.len())
    }

    /// Outgoing relationships of a block as recorded in the graph.
    pub fn relationships(&self, id: &str) -> Result<BlockRelationships, StoreError> {
        self.read()?
            .graph
            .relationships_of(id)
            .ok_or_else(|| StoreError::not_found("block", id))
    }

    /// Reached blocks with their minimum hop distance.
    pub fn hop_distances(&self, id: &str, max_depth: u32) -> Result<Vec<(String, u32)>, StoreError> {
        Ok(self.read()?.graph.hop_distances(id, max_depth))
    }

    // ── Versions ──

    pub fn get_version(&self, id: &str, version: u32) -> Result<BlockVersion, StoreError> {
        self.read()?
            .versions
            .get(id)
            .and_then(|h| h.iter().find(|v| v.version == version).cloned())
            .ok_or_else(|| StoreError::not_found("block version", format!("{id}:{version}")))
    }

    /// Up to `limit` versions of a block, newest first.
    pub fn version_history(&self, id: &str, limit: usize) -> Result<VersionHistory, StoreError> {
        let inner = self.read()?;
        let history = inner
            .versions
            .get(id)
            .ok_or_else(|| StoreError::not_found("block", id))?;
        let versions: Vec<BlockVersion> = history.iter().rev().take(limit).cloned().collect();
        let current_version = history
            .iter()
            .find(|v| v.is_current)
            .map(|v| v.version)
            .unwrap_or(1);
        Ok(VersionHistory {
            block_id: id.to_string(),
            total_versions: versions.len(),
            current_version,
            versions,
        })
    }

    /// Create a new version whose text fields come from `version`.
    ///
    /// Metadata and relationships stay as they are on the current block.
    pub fn restore_version(&self, id: &str, version: u32) -> Result<Block, StoreError> {
        let old = self.get_version(id, version)?;
        let mut inner = self.write()?;
        let mut block = inner
            .blocks
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("block", id))?;

        block.kind = old.kind;
        block.title = old.title;
        block.content = old.content;
        block.source = old.source;
        block.level = old.level;
        block.version += 1;
        block.updated_at = Utc::now();

        inner.record_version(&block, Some(format!("Restored from version {version}")));
        inner.blocks.insert(id.to_string(), block.clone());
        info!(block_id = %id, from = version, to = block.version, "block version restored");
        Ok(block)
    }

    pub fn compare_versions(&self, id: &str, old: u32, new: u32) -> Result<VersionDiff, StoreError> {
        let old = self.get_version(id, old)?;
        let new = self.get_version(id, new)?;
        Ok(VersionDiff::between(&old, &new))
    }

    // ── Rules ──

    pub fn create_rule(&self, rule: Rule) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if inner.rules.contains_key(&rule.id) {
            return Err(StoreError::AlreadyExists {
                kind: "rule",
                id: rule.id,
            });
        }
        inner.rules.insert(rule.id.clone(), rule);
        Ok(())
    }

    pub fn get_rule(&self, id: &str) -> Result<Rule, StoreError> {
        self.read()?
            .rules
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("rule", id))
    }

    /// Replace an existing rule, refreshing `updated_at`.
    pub fn update_rule(&self, mut rule: Rule) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        let existing = inner
            .rules
            .get_mut(&rule.id)
            .ok_or_else(|| StoreError::not_found("rule", rule.id.clone()))?;
        rule.created_at = existing.created_at;
        rule.updated_at = Utc::now();
        *existing = rule;
        Ok(())
    }

    pub fn list_rules(&self) -> Result<Vec<Rule>, StoreError> {
        Ok(self.read()?.rules.values().cloned().collect())
    }

    pub fn delete_rule(&self, id: &str) -> Result<(), StoreError> {
        self.write()?
            .rules
            .shift_remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("rule", id))
    }

    // ── Templates ──

    pub fn create_template(&self, template: Template) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if inner.templates.contains_key(&template.id) {
            return Err(StoreError::AlreadyExists {
                kind: "template",
                id: template.id,
            });
        }
        inner.templates.insert(template.id.clone(), template);
        Ok(())
    }

    pub fn list_templates(&self) -> Result<Vec<Template>, StoreError> {
        Ok(self.read()?.templates.values().cloned().collect())
    }

    // ── Documents ──

    pub fn get_document(&self, id: &str) -> Result<Document, StoreError> {
        self.read()?
            .documents
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("document", id))
    }

    /// Documents newest first.
    pub fn list_documents(&self, limit: usize, offset: usize) -> Result<Vec<Document>, StoreError> {
        let inner = self.read()?;
        let mut docs: Vec<&Document> = inner.documents.values().rev().collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(docs.into_iter().skip(offset).take(limit).cloned().collect())
    }

    pub fn update_document_status(&self, id: &str, status: DocumentStatus) -> Result<Document, StoreError> {
        let mut inner = self.write()?;
        let doc = inner
            .documents
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("document", id))?;
        doc.transition(status);
        Ok(doc.clone())
    }
}

#[async_trait]
impl BlockStore for MemoryStore {
    async fn get_block(&self, id: &str) -> Result<Block, StoreError> {
        self.read()?
            .blocks
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("block", id))
    }
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn list_enabled(&self) -> Result<Vec<Rule>, StoreError> {
        let inner = self.read()?;
        let mut rules: Vec<Rule> = inner.rules.values().filter(|r| r.enabled).cloned().collect();
        rules.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
        Ok(rules)
    }
}

#[async_trait]
impl TemplateStore for MemoryStore {
    async fn get_template(&self, id: &str) -> Result<Template, StoreError> {
        self.read()?
            .templates
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("template", id))
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn traverse(&self, block_id: &str, max_depth: u32) -> Result<IndexSet<String>, StoreError> {
        Ok(self.read()?.graph.within_hops(block_id, max_depth))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn save_document(&self, document: &Document) -> Result<(), StoreError> {
        self.write()?
            .documents
            .insert(document.id.clone(), document.clone());
        debug!(document_id = %document.id, "document saved");
        Ok(())
    }
}
