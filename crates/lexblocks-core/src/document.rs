//! Assembled documents.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::Context;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Draft,
    Assembled,
    Reviewed,
    Finalized,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Assembled => "assembled",
            Self::Reviewed => "reviewed",
            Self::Finalized => "finalized",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One block as materialised in a document.
///
/// `content` is a snapshot taken at assembly time, not a live reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentBlock {
    pub block_id: String,
    pub content: String,
    /// Zero-based, contiguous position within the document.
    pub order: usize,
    pub level: u32,
}

/// The assembled output artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub status: DocumentStatus,
    #[serde(default)]
    pub blocks: Vec<DocumentBlock>,
    /// Variables used at assembly time, verbatim.
    #[serde(default)]
    pub context: Context,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u32,
}

impl Document {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            template_id: None,
            status: DocumentStatus::Draft,
            blocks: Vec::new(),
            context: Context::new(),
            author: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    /// Move to `status`, bumping the version counter.
    pub fn transition(&mut self, status: DocumentStatus) {
        self.status = status;
        self.version += 1;
        self.updated_at = Utc::now();
    }

    /// Blocks sorted by their order index.
    pub fn ordered_blocks(&self) -> Vec<&DocumentBlock> {
        let mut blocks: Vec<&DocumentBlock> = self.blocks.iter().collect();
        blocks.sort_by_key(|b| b.order);
        blocks
    }
}
