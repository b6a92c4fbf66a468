//! Blocks: atomic, addressable units of legal text.

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::sort_key::citation_sort_key;

/// Citation and classification metadata for a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockMetadata {
    /// Law abbreviation, e.g. "SGB IX", "BGB".
    #[serde(default)]
    pub law: Option<String>,
    /// Paragraph number as written, e.g. "29" or "§ 35a".
    #[serde(default)]
    pub paragraph: Option<String>,
    #[serde(default)]
    pub absatz: Option<u32>,
    #[serde(default)]
    pub satz: Option<u32>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub effective_date: Option<String>,
    #[serde(default)]
    pub tags: IndexSet<String>,
    #[serde(default)]
    pub custom: IndexMap<String, serde_json::Value>,
}

fn default_language() -> String {
    "de".to_string()
}

impl Default for BlockMetadata {
    fn default() -> Self {
        Self {
            law: None,
            paragraph: None,
            absatz: None,
            satz: None,
            language: default_language(),
            effective_date: None,
            tags: IndexSet::new(),
            custom: IndexMap::new(),
        }
    }
}

/// Outgoing relationship edges declared on a block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRelationships {
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub related: Vec<String>,
}

impl BlockRelationships {
    pub fn is_empty(&self) -> bool {
        self.parent.is_none()
            && self.children.is_empty()
            && self.references.is_empty()
            && self.related.is_empty()
    }
}

/// An atomic unit of structured legal text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    /// Type tag: paragraph, absatz, custom, ...
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub content: String,
    /// Origin law or document.
    pub source: String,
    /// Nesting depth, 1 for top level.
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub metadata: BlockMetadata,
    #[serde(default)]
    pub relationships: BlockRelationships,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_level() -> u32 {
    1
}

fn default_version() -> u32 {
    1
}

impl Block {
    /// A fresh block at version 1 with empty metadata and relationships.
    pub fn new(
        id: impl Into<String>,
        kind: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            kind: kind.into(),
            title: title.into(),
            content: content.into(),
            source: source.into(),
            level: 1,
            metadata: BlockMetadata::default(),
            relationships: BlockRelationships::default(),
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level.max(1);
        self
    }

    pub fn with_relationships(mut self, relationships: BlockRelationships) -> Self {
        self.relationships = relationships;
        self
    }

    pub fn with_metadata(mut self, metadata: BlockMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Sort key placing blocks in statutory order within one source.
    pub fn sort_key(&self) -> String {
        citation_sort_key(
            self.metadata.paragraph.as_deref(),
            self.metadata.absatz,
            self.metadata.satz,
        )
    }

    /// Apply the non-empty fields of an update. Does not touch the version.
    pub fn apply(&mut self, update: BlockUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(content) = update.content {
            self.content = content;
        }
        if let Some(level) = update.level {
            self.level = level.max(1);
        }
        if let Some(metadata) = update.metadata {
            self.metadata = metadata;
        }
        if let Some(relationships) = update.relationships {
            self.relationships = relationships;
        }
    }
}

/// Partial update of a block. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub metadata: Option<BlockMetadata>,
    #[serde(default)]
    pub relationships: Option<BlockRelationships>,
}

impl BlockUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.level.is_none()
            && self.metadata.is_none()
            && self.relationships.is_none()
    }
}

/// Snapshot of a block at one version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockVersion {
    /// `<block_id>:<version>`.
    pub id: String,
    pub block_id: String,
    pub version: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub content: String,
    pub source: String,
    pub level: u32,
    pub metadata: BlockMetadata,
    pub relationships: BlockRelationships,
    pub created_at: DateTime<Utc>,
    pub change_summary: Option<String>,
    pub is_current: bool,
}

impl BlockVersion {
    pub fn snapshot(block: &Block, change_summary: Option<String>) -> Self {
        Self {
            id: format!("{}:{}", block.id, block.version),
            block_id: block.id.clone(),
            version: block.version,
            kind: block.kind.clone(),
            title: block.title.clone(),
            content: block.content.clone(),
            source: block.source.clone(),
            level: block.level,
            metadata: block.metadata.clone(),
            relationships: block.relationships.clone(),
            created_at: Utc::now(),
            change_summary,
            is_current: true,
        }
    }
}

/// One changed field between two versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: String,
    pub new: String,
}

/// Field-level difference between two versions of a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionDiff {
    pub block_id: String,
    pub old_version: u32,
    pub new_version: u32,
    /// Keyed by field name: type, title, content, source, level.
    pub changes: IndexMap<String, FieldChange>,
    pub changed_at: DateTime<Utc>,
}

impl VersionDiff {
    pub fn between(old: &BlockVersion, new: &BlockVersion) -> Self {
        let mut changes = IndexMap::new();
        let fields = [
            ("type", old.kind.clone(), new.kind.clone()),
            ("title", old.title.clone(), new.title.clone()),
            ("content", old.content.clone(), new.content.clone()),
            ("source", old.source.clone(), new.source.clone()),
            ("level", old.level.to_string(), new.level.to_string()),
        ];
        for (name, before, after) in fields {
            if before != after {
                changes.insert(
                    name.to_string(),
                    FieldChange {
                        old: before,
                        new: after,
                    },
                );
            }
        }
        Self {
            block_id: new.block_id.clone(),
            old_version: old.version,
            new_version: new.version,
            changes,
            changed_at: new.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_json_defaults() {
        let json = r#"{
            "id": "sgb9_para29",
            "type": "paragraph",
            "title": "§29 Persönliches Budget",
            "content": "Auf Antrag der Leistungsberechtigten...",
            "source": "SGB IX",
            "metadata": {"law": "SGB IX", "paragraph": "29", "tags": ["budget", "teilhabe", "budget"]},
            "relationships": {"references": ["sgb9_para5"], "children": ["sgb9_para29_abs1"]}
        }"#;
        let block: Block = serde_json::from_str(json).unwrap();
        assert_eq!(block.level, 1);
        assert_eq!(block.version, 1);
        assert_eq!(block.metadata.language, "de");
        assert_eq!(block.metadata.tags.len(), 2);
        assert_eq!(block.relationships.parent, None);
        assert_eq!(block.relationships.children, vec!["sgb9_para29_abs1"]);
        assert!(block.relationships.related.is_empty());
    }

    #[test]
    fn apply_skips_empty_fields() {
        let mut block = Block::new("b1", "paragraph", "Old", "old text", "SGB IX");
        block.apply(BlockUpdate {
            content: Some("new text".into()),
            level: Some(0),
            ..Default::default()
        });
        assert_eq!(block.title, "Old");
        assert_eq!(block.content, "new text");
        assert_eq!(block.level, 1, "level is clamped to at least 1");
        assert_eq!(block.version, 1, "apply does not bump the version");
    }

    #[test]
    fn diff_lists_only_changed_fields() {
        let mut block = Block::new("b1", "paragraph", "Title", "v1", "SGB IX");
        let v1 = BlockVersion::snapshot(&block, Some("Initial version".into()));
        block.content = "v2".into();
        block.version = 2;
        let v2 = BlockVersion::snapshot(&block, None);

        let diff = VersionDiff::between(&v1, &v2);
        assert_eq!(diff.old_version, 1);
        assert_eq!(diff.new_version, 2);
        assert_eq!(diff.changes.len(), 1);
        assert_eq!(diff.changes["content"].old, "v1");
        assert_eq!(diff.changes["content"].new, "v2");
        assert_eq!(v2.id, "b1:2");
    }
}
