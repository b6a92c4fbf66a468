//! Document assembly: template sections and rule-selected blocks merged into
//! one ordered, deduplicated document.

use std::sync::Arc;

use futures::future;
use indexmap::IndexSet;
use lexblocks_core::template::{Template, select_blocks};
use lexblocks_core::{Block, Context, Document, DocumentBlock, DocumentStatus};
use lexblocks_store::{BlockStore, DocumentStore, RuleStore, StoreError, TemplateStore};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{AssemblyError, RuleEngine};

/// Outcome of one assembly.
#[derive(Debug, Clone, Serialize)]
pub struct AssemblyResult {
    pub document: Document,
    /// Number of blocks materialised in the document.
    pub blocks_included: usize,
    /// Distinct block ids contributed by matched rules, before merging with
    /// template blocks.
    pub rules_applied: usize,
    /// Candidate ids the block store could not resolve, in candidate order.
    pub unresolved_block_ids: Vec<String>,
    pub message: String,
}

/// Builds documents from templates, rules and the block store.
pub struct Assembler {
    blocks: Arc<dyn BlockStore>,
    templates: Arc<dyn TemplateStore>,
    documents: Arc<dyn DocumentStore>,
    engine: RuleEngine,
}

impl Assembler {
    pub fn new(
        blocks: Arc<dyn BlockStore>,
        rules: Arc<dyn RuleStore>,
        templates: Arc<dyn TemplateStore>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            blocks,
            templates,
            documents,
            engine: RuleEngine::new(rules),
        }
    }

    /// All four stores served by one backend.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: BlockStore + RuleStore + TemplateStore + DocumentStore + 'static,
    {
        Self::new(store.clone(), store.clone(), store.clone(), store)
    }

    /// Assemble a new document from `template_id` and `context`, persist it
    /// and return it with its counters.
    ///
    /// Block ids the block store cannot resolve are left out and reported in
    /// `unresolved_block_ids`; they never fail the assembly.
    ///
    /// # Errors
    ///
    /// - `TemplateNotFound` if the template id does not resolve
    /// - `Store` for any other store failure, unchanged
    pub async fn assemble(
        &self,
        template_id: &str,
        context: Context,
        title: Option<String>,
    ) -> Result<AssemblyResult, AssemblyError> {
        let template = self.resolve_template(template_id).await?;
        let rule_blocks = self.engine.get_blocks_to_include(&context).await?;

        let selection = select_blocks(&template, &context);
        if !selection.unmet_required.is_empty() {
            debug!(
                template_id,
                sections = ?selection.unmet_required,
                "required sections gated out"
            );
        }

        let candidates = merge_candidates(&selection.block_ids, &rule_blocks);
        let (resolved, unresolved) = self.resolve_blocks(&candidates).await?;

        let title = title.unwrap_or_else(|| format!("Document from {}", template.name));
        let mut document = Document::new(new_document_id(), title);
        document.template_id = Some(template.id.clone());
        document.status = DocumentStatus::Assembled;
        document.context = context;
        document.blocks = materialize(&resolved);

        self.documents.save_document(&document).await?;

        let blocks_included = document.blocks.len();
        let rules_applied = rule_blocks.len();
        info!(
            document_id = %document.id,
            blocks_included,
            rules_applied,
            unresolved = unresolved.len(),
            "document assembled"
        );

        Ok(AssemblyResult {
            message: format!("Document assembled successfully with {blocks_included} blocks"),
            document,
            blocks_included,
            rules_applied,
            unresolved_block_ids: unresolved,
        })
    }

    async fn resolve_template(&self, template_id: &str) -> Result<Template, AssemblyError> {
        match self.templates.get_template(template_id).await {
            Ok(template) => {
                debug!(template_id, sections = template.sections.len(), "template resolved");
                Ok(template)
            }
            Err(e) if e.is_not_found() => Err(AssemblyError::TemplateNotFound(template_id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch every candidate, keeping candidate order. Missing blocks are
    /// split off; any other failure aborts.
    async fn resolve_blocks(
        &self,
        candidates: &IndexSet<String>,
    ) -> Result<(Vec<Block>, Vec<String>), StoreError> {
        let fetched = future::join_all(candidates.iter().map(|id| self.blocks.get_block(id))).await;

        let mut resolved = Vec::with_capacity(fetched.len());
        let mut unresolved = Vec::new();
        for (id, result) in candidates.iter().zip(fetched) {
            match result {
                Ok(block) => resolved.push(block),
                Err(e) if e.is_not_found() => {
                    warn!(block_id = %id, "block not found, skipping");
                    unresolved.push(id.clone());
                }
                Err(e) => return Err(e),
            }
        }
        Ok((resolved, unresolved))
    }
}

/// Template candidates followed by rule candidates, keeping the first
/// occurrence of every id.
pub fn merge_candidates(template_blocks: &[String], rule_blocks: &IndexSet<String>) -> IndexSet<String> {
    template_blocks
        .iter()
        .chain(rule_blocks.iter())
        .cloned()
        .collect()
}

/// Snapshot resolved blocks into document entries ordered `0..n`.
pub fn materialize(blocks: &[Block]) -> Vec<DocumentBlock> {
    blocks
        .iter()
        .enumerate()
        .map(|(order, block)| DocumentBlock {
            block_id: block.id.clone(),
            content: block.content.clone(),
            order,
            level: block.level,
        })
        .collect()
}

/// `doc_` followed by 12 hex characters.
pub fn new_document_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("doc_{}", &hex[..12])
}
