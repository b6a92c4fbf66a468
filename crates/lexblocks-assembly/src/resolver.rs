//! Related-block lookup over the relationship graph.

use std::sync::Arc;

use indexmap::IndexSet;
use lexblocks_store::{GraphStore, StoreError};
use tracing::debug;

/// Shallowest traversal depth accepted.
pub const MIN_DEPTH: u32 = 1;
/// Deepest traversal depth accepted. Larger requests are clamped.
pub const MAX_DEPTH: u32 = 5;
pub const DEFAULT_DEPTH: u32 = 2;

#[derive(Clone)]
pub struct RelationshipResolver {
    graph: Arc<dyn GraphStore>,
}

impl RelationshipResolver {
    pub fn new(graph: Arc<dyn GraphStore>) -> Self {
        Self { graph }
    }

    /// Distinct block ids within `max_depth` hops of `block_id`, in either
    /// edge direction, excluding `block_id`. `max_depth` is clamped to
    /// `MIN_DEPTH..=MAX_DEPTH`. An unknown block yields an empty set.
    pub async fn find_related(&self, block_id: &str, max_depth: u32) -> Result<IndexSet<String>, StoreError> {
        let depth = clamp_depth(max_depth);
        let related = self.graph.traverse(block_id, depth).await?;
        debug!(block_id, depth, count = related.len(), "related blocks resolved");
        Ok(related)
    }
}

pub fn clamp_depth(depth: u32) -> u32 {
    depth.clamp(MIN_DEPTH, MAX_DEPTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexblocks_core::{Block, BlockRelationships};
    use lexblocks_store::MemoryStore;

    fn chain(ids: &[&str]) -> MemoryStore {
        // Each block references the next: ids[0] → ids[1] → ...
        let store = MemoryStore::new();
        let blocks = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let block = Block::new(*id, "paragraph", *id, format!("Text {id}"), "SGB IX");
                match ids.get(i + 1) {
                    Some(next) => block.with_relationships(BlockRelationships {
                        references: vec![next.to_string()],
                        ..Default::default()
                    }),
                    None => block,
                }
            })
            .collect();
        store.create_blocks(blocks).unwrap();
        store
    }

    fn sorted(set: IndexSet<String>) -> Vec<String> {
        let mut v: Vec<String> = set.into_iter().collect();
        v.sort();
        v
    }

    #[test]
    fn depth_is_clamped() {
        assert_eq!(clamp_depth(0), MIN_DEPTH);
        assert_eq!(clamp_depth(3), 3);
        assert_eq!(clamp_depth(99), MAX_DEPTH);
    }

    #[tokio::test]
    async fn one_and_two_hops() {
        let resolver = RelationshipResolver::new(Arc::new(chain(&["a", "b", "c"])));
        assert_eq!(sorted(resolver.find_related("a", 1).await.unwrap()), ["b"]);
        assert_eq!(sorted(resolver.find_related("a", 2).await.unwrap()), ["b", "c"]);
    }

    #[tokio::test]
    async fn traversal_ignores_edge_direction() {
        let resolver = RelationshipResolver::new(Arc::new(chain(&["a", "b", "c"])));
        assert_eq!(sorted(resolver.find_related("c", 2).await.unwrap()), ["a", "b"]);
    }

    #[tokio::test]
    async fn depth_zero_behaves_as_one() {
        let resolver = RelationshipResolver::new(Arc::new(chain(&["a", "b", "c"])));
        assert_eq!(sorted(resolver.find_related("a", 0).await.unwrap()), ["b"]);
    }

    #[tokio::test]
    async fn depth_above_max_is_capped() {
        let ids = ["n0", "n1", "n2", "n3", "n4", "n5", "n6", "n7"];
        let resolver = RelationshipResolver::new(Arc::new(chain(&ids)));
        let related = resolver.find_related("n0", 50).await.unwrap();
        assert_eq!(related.len(), MAX_DEPTH as usize);
        assert!(!related.contains("n6"));
    }

    #[tokio::test]
    async fn unknown_block_is_empty() {
        let resolver = RelationshipResolver::new(Arc::new(chain(&["a", "b"])));
        assert!(resolver.find_related("missing", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn source_is_excluded_from_cycles() {
        let store = chain(&["a", "b"]);
        store
            .update_block(
                "b",
                lexblocks_core::BlockUpdate {
                    relationships: Some(BlockRelationships {
                        references: vec!["a".into()],
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                None,
            )
            .unwrap();
        let resolver = RelationshipResolver::new(Arc::new(store));
        assert_eq!(sorted(resolver.find_related("a", 5).await.unwrap()), ["b"]);
    }
}
