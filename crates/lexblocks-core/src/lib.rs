pub mod block;
pub mod condition;
pub mod document;
pub mod graph;
pub mod rules;
pub mod sort_key;
pub mod template;
pub mod value;

pub use block::{Block, BlockMetadata, BlockRelationships, BlockUpdate, BlockVersion, VersionDiff};
pub use condition::{Condition, ConditionError, Operator};
pub use document::{Document, DocumentBlock, DocumentStatus};
pub use graph::{BlockGraph, Edge, RelationKind};
pub use rules::{
    Action, ActionKind, ActionState, ConditionGroup, LogicalOperator, Rule, RuleEvaluation,
};
pub use sort_key::{citation_sort_key, normalize_paragraph};
pub use template::{SectionSelection, Template, TemplateSection};
pub use value::{Context, Value};
