//! Stateful services over the stores: rule evaluation, related-block
//! lookup and document assembly.

mod error;
pub use error::AssemblyError;

pub mod assembler;
pub mod engine;
pub mod resolver;

pub use assembler::{AssemblyResult, Assembler};
pub use engine::RuleEngine;
pub use resolver::{DEFAULT_DEPTH, MAX_DEPTH, MIN_DEPTH, RelationshipResolver};
