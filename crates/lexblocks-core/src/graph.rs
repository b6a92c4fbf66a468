//! In-memory block relationship graph.
//!
//! Edges are directed and labelled with their relationship kind, but every
//! traversal treats them as undirected: a reference from A to B makes B
//! reachable from A and A reachable from B.

use std::collections::{HashMap, VecDeque};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockRelationships};

/// Kind of a relationship edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationKind {
    /// Child points at its parent.
    Parent,
    /// Parent points at a child.
    Child,
    References,
    RelatedTo,
}

/// A directed, labelled edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub kind: RelationKind,
}

/// Adjacency structure over block ids.
#[derive(Debug, Clone, Default)]
pub struct BlockGraph {
    nodes: IndexSet<String>,
    outgoing: HashMap<String, IndexSet<(String, RelationKind)>>,
    incoming: HashMap<String, IndexSet<(String, RelationKind)>>,
}

impl BlockGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node. Returns `false` when it already existed.
    pub fn add_node(&mut self, id: &str) -> bool {
        self.nodes.insert(id.to_string())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.outgoing.values().map(IndexSet::len).sum()
    }

    /// Add an edge between two existing nodes. Idempotent.
    ///
    /// Returns `false` when either endpoint is unknown or the edge already exists.
    pub fn add_edge(&mut self, from: &str, to: &str, kind: RelationKind) -> bool {
        if !self.contains(from) || !self.contains(to) {
            return false;
        }
        let added = self
            .outgoing
            .entry(from.to_string())
            .or_default()
            .insert((to.to_string(), kind));
        self.incoming
            .entry(to.to_string())
            .or_default()
            .insert((from.to_string(), kind));
        added
    }

    /// Create the outgoing edges declared on `block`. Returns the number added.
    ///
    /// Targets that are not yet nodes are skipped.
    pub fn link(&mut self, block: &Block) -> usize {
        edges_declared_by(block)
            .into_iter()
            .filter(|e| self.add_edge(&e.from, &e.to, e.kind))
            .count()
    }

    /// Drop every outgoing edge of `id`, keeping the node and its incoming edges.
    pub fn unlink_outgoing(&mut self, id: &str) {
        if let Some(out) = self.outgoing.remove(id) {
            for (to, kind) in out {
                if let Some(inc) = self.incoming.get_mut(&to) {
                    inc.shift_remove(&(id.to_string(), kind));
                }
            }
        }
    }

    /// Remove a node and every edge touching it. Returns `false` when absent.
    pub fn remove_node(&mut self, id: &str) -> bool {
        if !self.nodes.shift_remove(id) {
            return false;
        }
        self.unlink_outgoing(id);
        if let Some(inc) = self.incoming.remove(id) {
            for (from, kind) in inc {
                if let Some(out) = self.outgoing.get_mut(&from) {
                    out.shift_remove(&(id.to_string(), kind));
                }
            }
        }
        true
    }

    /// Outgoing edges of `id`, in insertion order.
    pub fn edges_from(&self, id: &str) -> Vec<Edge> {
        self.outgoing
            .get(id)
            .map(|out| {
                out.iter()
                    .map(|(to, kind)| Edge {
                        from: id.to_string(),
                        to: to.clone(),
                        kind: *kind,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Undirected neighbours of `id`.
    pub fn neighbours(&self, id: &str) -> Vec<&str> {
        let out = self.outgoing.get(id).into_iter().flatten();
        let inc = self.incoming.get(id).into_iter().flatten();
        out.chain(inc).map(|(other, _)| other.as_str()).collect()
    }

    /// Minimum hop count to every node within `max_depth` hops of `id`.
    ///
    /// The source itself is excluded. Ordered by hop, then id. Unknown
    /// sources and a zero depth yield nothing.
    pub fn hop_distances(&self, id: &str, max_depth: u32) -> Vec<(String, u32)> {
        if !self.contains(id) || max_depth == 0 {
            return Vec::new();
        }

        let mut seen: IndexMap<&str, u32> = IndexMap::new();
        seen.insert(id, 0);
        let mut queue = VecDeque::from([(id, 0u32)]);

        while let Some((current, hop)) = queue.pop_front() {
            if hop == max_depth {
                continue;
            }
            for next in self.neighbours(current) {
                if !seen.contains_key(next) {
                    seen.insert(next, hop + 1);
                    queue.push_back((next, hop + 1));
                }
            }
        }

        let mut reached: Vec<(String, u32)> = seen
            .into_iter()
            .skip(1)
            .map(|(node, hop)| (node.to_string(), hop))
            .collect();
        reached.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        reached
    }

    /// Distinct ids reachable within `max_depth` hops, excluding `id`.
    pub fn within_hops(&self, id: &str, max_depth: u32) -> IndexSet<String> {
        self.hop_distances(id, max_depth)
            .into_iter()
            .map(|(node, _)| node)
            .collect()
    }

    /// Rebuild the outgoing relationships of `id` from its edges.
    pub fn relationships_of(&self, id: &str) -> Option<BlockRelationships> {
        if !self.contains(id) {
            return None;
        }
        let mut rel = BlockRelationships::default();
        for edge in self.edges_from(id) {
            match edge.kind {
                RelationKind::Parent => rel.parent = Some(edge.to),
                RelationKind::Child => rel.children.push(edge.to),
                RelationKind::References => rel.references.push(edge.to),
                RelationKind::RelatedTo => rel.related.push(edge.to),
            }
        }
        Some(rel)
    }
}

/// Edges a block declares through its relationships, before endpoint checks.
pub fn edges_declared_by(block: &Block) -> Vec<Edge> {
    let rel = &block.relationships;
    let edge = |to: &String, kind| Edge {
        from: block.id.clone(),
        to: to.clone(),
        kind,
    };
    let mut edges = Vec::new();
    if let Some(parent) = &rel.parent {
        edges.push(edge(parent, RelationKind::Parent));
    }
    edges.extend(rel.children.iter().map(|c| edge(c, RelationKind::Child)));
    edges.extend(rel.references.iter().map(|r| edge(r, RelationKind::References)));
    edges.extend(rel.related.iter().map(|r| edge(r, RelationKind::RelatedTo)));
    edges
}
