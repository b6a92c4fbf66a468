//! Templates and section gating.
//!
//! A section is included when every key of its condition map has an exactly
//! equal value in the context. A section without conditions is always
//! included. Included sections contribute their block ids in list order.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::value::{Context, Value};

/// One part of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSection {
    pub id: String,
    /// header, content or footer.
    #[serde(rename = "type")]
    pub kind: String,
    /// Informational only: an excluded required section does not fail assembly.
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub blocks: Vec<String>,
    /// Static text carried with the section.
    #[serde(default)]
    pub content: Option<String>,
    /// AND-only equality gate over context keys.
    #[serde(default)]
    pub conditions: IndexMap<String, Value>,
}

fn default_required() -> bool {
    true
}

impl TemplateSection {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, blocks: Vec<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            required: true,
            blocks,
            content: None,
            conditions: IndexMap::new(),
        }
    }

    pub fn when(mut self, key: impl Into<String>, expected: impl Into<Value>) -> Self {
        self.conditions.insert(key.into(), expected.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Whether this section's gate passes for `context`.
    ///
    /// A key absent from the context excludes the section, whatever the
    /// expected value.
    pub fn matches(&self, context: &Context) -> bool {
        self.conditions
            .iter()
            .all(|(key, expected)| context.get(key).is_some_and(|actual| actual == expected))
    }
}

/// A named, ordered set of sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub sections: Vec<TemplateSection>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Template {
    pub fn new(id: impl Into<String>, name: impl Into<String>, sections: Vec<TemplateSection>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            sections,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Result of running a template's sections against a context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionSelection {
    /// Candidate block ids in section order. May contain duplicates.
    pub block_ids: Vec<String>,
    pub included_sections: Vec<String>,
    pub excluded_sections: Vec<String>,
    /// Required sections that were excluded by their gate.
    pub unmet_required: Vec<String>,
}

/// Select candidate block ids from `template` for `context`.
pub fn select_blocks(template: &Template, context: &Context) -> SectionSelection {
    let mut selection = SectionSelection::default();
    for section in &template.sections {
        if !section.matches(context) {
            debug!(template_id = %template.id, section_id = %section.id, "section gated out");
            if section.required {
                selection.unmet_required.push(section.id.clone());
            }
            selection.excluded_sections.push(section.id.clone());
            continue;
        }
        selection.block_ids.extend(section.blocks.iter().cloned());
        selection.included_sections.push(section.id.clone());
    }
    selection
}
