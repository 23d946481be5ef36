//! # Graph Store
//!
//! The authoritative node collection and its index set.
//!
//! `Graph` keeps four indexes that move together on every mutation:
//! - primary map: `NodeId -> Node`
//! - path index: `path -> NodeId`
//! - type index: `NodeType -> {NodeId}`
//! - reverse adjacency: `target -> source -> {RelationshipType}`
//!
//! Every mutation validates first and commits second, so a failed call
//! leaves all indexes untouched. Updates patch the reverse adjacency by
//! diffing old and new relationships; nothing is rebuilt from scratch.
//!
//! All data structures use `BTreeMap`/`BTreeSet` for deterministic ordering.
//! The collection's natural order is insertion order, tracked by ordinal.

use crate::primitives::GENERATED_ID_PREFIX;
use crate::{Node, NodeId, NodeRelationship, NodeType, RelationshipType, SemgraphError};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// GRAPHSTORE TRAIT
// =============================================================================

/// The GraphStore trait defines the node-level read/write contract.
///
/// Lookups return `None` for unknown keys; only mutations fail, and only
/// with `DuplicateId`, `DuplicatePath` or `NotFound`.
pub trait GraphStore {
    /// Insert a new node and index it.
    fn add(&mut self, node: Node) -> Result<(), SemgraphError>;

    /// Replace an existing node. Returns the previous value.
    fn update(&mut self, node: Node) -> Result<Node, SemgraphError>;

    /// Delete a node and every index entry it owns. Returns the removed value.
    fn remove(&mut self, id: &NodeId) -> Result<Node, SemgraphError>;

    /// Lookup by id.
    fn get(&self, id: &NodeId) -> Option<&Node>;

    /// Lookup by path.
    fn get_by_path(&self, path: &str) -> Option<&Node>;

    /// Check if a node is live.
    fn contains(&self, id: &NodeId) -> bool;

    /// Full snapshot in insertion order.
    fn all(&self) -> Vec<&Node>;

    /// Nodes of one type, in insertion order.
    fn nodes_of_type(&self, node_type: NodeType) -> Vec<&Node>;

    /// Reverse adjacency: every `(source, kind)` whose forward relationship
    /// targets `target`. Sources are always live.
    fn incoming(&self, target: &NodeId) -> Vec<(&NodeId, RelationshipType)>;

    /// Number of live nodes.
    fn node_count(&self) -> usize;

    /// Number of forward relationships across all live nodes.
    fn relationship_count(&self) -> usize;
}

// =============================================================================
// GRAPH IMPLEMENTATION
// =============================================================================

/// A stored node plus its insertion ordinal.
#[derive(Debug, Clone)]
struct Slot {
    ordinal: u64,
    node: Node,
}

type ReverseIndex = BTreeMap<NodeId, BTreeMap<NodeId, BTreeSet<RelationshipType>>>;

/// The in-memory graph store.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Primary map: NodeId -> Slot
    nodes: BTreeMap<NodeId, Slot>,

    /// Insertion order: ordinal -> NodeId
    order: BTreeMap<u64, NodeId>,

    /// Path index: path -> NodeId
    path_index: BTreeMap<String, NodeId>,

    /// Type index: NodeType -> ids of that type
    type_index: BTreeMap<NodeType, BTreeSet<NodeId>>,

    /// Reverse adjacency: target -> (source -> kinds).
    /// Keyed by target even when the target is not live, so a node added
    /// later immediately sees the edges already pointing at it.
    reverse: ReverseIndex,

    /// Next insertion ordinal
    next_ordinal: u64,
}

impl Graph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce an id no live node uses.
    #[must_use]
    pub fn fresh_id(&self) -> NodeId {
        let mut n = self.next_ordinal;
        loop {
            let candidate = NodeId(format!("{GENERATED_ID_PREFIX}{n}"));
            if !self.nodes.contains_key(&candidate) {
                return candidate;
            }
            n = n.saturating_add(1);
        }
    }

    /// Audit every index against the primary map.
    ///
    /// Returns one message per violation; empty means consistent.
    #[must_use]
    pub fn check_consistency(&self) -> Vec<String> {
        let mut violations = Vec::new();

        if self.path_index.len() != self.nodes.len() {
            violations.push(format!(
                "path index has {} entries for {} nodes",
                self.path_index.len(),
                self.nodes.len()
            ));
        }
        if self.order.len() != self.nodes.len() {
            violations.push(format!(
                "order index has {} entries for {} nodes",
                self.order.len(),
                self.nodes.len()
            ));
        }

        let typed: usize = self.type_index.values().map(BTreeSet::len).sum();
        if typed != self.nodes.len() {
            violations.push(format!(
                "type index has {} entries for {} nodes",
                typed,
                self.nodes.len()
            ));
        }

        for (id, slot) in &self.nodes {
            if self.path_index.get(&slot.node.path) != Some(id) {
                violations.push(format!("path {} does not resolve to {}", slot.node.path, id));
            }
            if !self
                .type_index
                .get(&slot.node.node_type)
                .is_some_and(|ids| ids.contains(id))
            {
                violations.push(format!("{} missing from its type bucket", id));
            }
            if self.order.get(&slot.ordinal) != Some(id) {
                violations.push(format!("{} missing from insertion order", id));
            }
            for rel in &slot.node.relationships {
                let recorded = self
                    .reverse
                    .get(&rel.target_id)
                    .and_then(|sources| sources.get(id))
                    .is_some_and(|kinds| kinds.contains(&rel.kind));
                if !recorded {
                    violations.push(format!(
                        "reverse adjacency of {} lacks {} ({})",
                        rel.target_id, id, rel.kind
                    ));
                }
            }
        }

        for (target, sources) in &self.reverse {
            for (source, kinds) in sources {
                let Some(slot) = self.nodes.get(source) else {
                    violations.push(format!("reverse adjacency of {} lists dead {}", target, source));
                    continue;
                };
                for kind in kinds {
                    let owned = slot
                        .node
                        .relationships
                        .iter()
                        .any(|r| r.kind == *kind && r.target_id == *target);
                    if !owned {
                        violations.push(format!(
                            "reverse adjacency of {} lists {} ({}) with no forward edge",
                            target, source, kind
                        ));
                    }
                }
            }
        }

        violations
    }
}

// =============================================================================
// REVERSE ADJACENCY MAINTENANCE
// =============================================================================

fn edge_set(relationships: &[NodeRelationship]) -> BTreeSet<&NodeRelationship> {
    relationships.iter().collect()
}

fn link<'a>(
    reverse: &mut ReverseIndex,
    source: &NodeId,
    relationships: impl IntoIterator<Item = &'a NodeRelationship>,
) {
    for rel in relationships {
        reverse
            .entry(rel.target_id.clone())
            .or_default()
            .entry(source.clone())
            .or_default()
            .insert(rel.kind);
    }
}

fn unlink<'a>(
    reverse: &mut ReverseIndex,
    source: &NodeId,
    relationships: impl IntoIterator<Item = &'a NodeRelationship>,
) {
    for rel in relationships {
        let Some(sources) = reverse.get_mut(&rel.target_id) else {
            continue;
        };
        if let Some(kinds) = sources.get_mut(source) {
            kinds.remove(&rel.kind);
            if kinds.is_empty() {
                sources.remove(source);
            }
        }
        if sources.is_empty() {
            reverse.remove(&rel.target_id);
        }
    }
}

// =============================================================================
// GRAPHSTORE FOR GRAPH
// =============================================================================

impl GraphStore for Graph {
    fn add(&mut self, node: Node) -> Result<(), SemgraphError> {
        if self.nodes.contains_key(&node.id) {
            return Err(SemgraphError::DuplicateId(node.id));
        }
        if self.path_index.contains_key(&node.path) {
            return Err(SemgraphError::DuplicatePath(node.path));
        }

        let ordinal = self.next_ordinal;
        self.next_ordinal = self.next_ordinal.saturating_add(1);

        self.path_index.insert(node.path.clone(), node.id.clone());
        self.type_index
            .entry(node.node_type)
            .or_default()
            .insert(node.id.clone());
        link(&mut self.reverse, &node.id, edge_set(&node.relationships));
        self.order.insert(ordinal, node.id.clone());

        tracing::debug!(
            node = %node.id,
            path = %node.path,
            node_type = %node.node_type,
            relationships = node.relationships.len(),
            "node added"
        );
        self.nodes.insert(node.id.clone(), Slot { ordinal, node });
        Ok(())
    }

    fn update(&mut self, node: Node) -> Result<Node, SemgraphError> {
        let Some(current) = self.nodes.get(&node.id) else {
            return Err(SemgraphError::NotFound(node.id));
        };
        let path_changed = current.node.path != node.path;
        if path_changed && self.path_index.contains_key(&node.path) {
            return Err(SemgraphError::DuplicatePath(node.path));
        }

        let Some(slot) = self.nodes.get_mut(&node.id) else {
            return Err(SemgraphError::NotFound(node.id));
        };
        let old = std::mem::replace(&mut slot.node, node);
        let new = &slot.node;

        if path_changed {
            self.path_index.remove(&old.path);
            self.path_index.insert(new.path.clone(), new.id.clone());
        }

        if old.node_type != new.node_type {
            if let Some(bucket) = self.type_index.get_mut(&old.node_type) {
                bucket.remove(&new.id);
                if bucket.is_empty() {
                    self.type_index.remove(&old.node_type);
                }
            }
            self.type_index
                .entry(new.node_type)
                .or_default()
                .insert(new.id.clone());
        }

        let old_edges = edge_set(&old.relationships);
        let new_edges = edge_set(&new.relationships);
        let stale: Vec<&NodeRelationship> = old_edges.difference(&new_edges).copied().collect();
        let fresh: Vec<&NodeRelationship> = new_edges.difference(&old_edges).copied().collect();
        unlink(&mut self.reverse, &new.id, stale.iter().copied());
        link(&mut self.reverse, &new.id, fresh.iter().copied());

        tracing::debug!(
            node = %new.id,
            path_changed,
            edges_removed = stale.len(),
            edges_added = fresh.len(),
            "node updated"
        );
        Ok(old)
    }

    fn remove(&mut self, id: &NodeId) -> Result<Node, SemgraphError> {
        let Some(slot) = self.nodes.remove(id) else {
            return Err(SemgraphError::NotFound(id.clone()));
        };

        self.order.remove(&slot.ordinal);
        self.path_index.remove(&slot.node.path);
        if let Some(bucket) = self.type_index.get_mut(&slot.node.node_type) {
            bucket.remove(id);
            if bucket.is_empty() {
                self.type_index.remove(&slot.node.node_type);
            }
        }
        unlink(&mut self.reverse, id, edge_set(&slot.node.relationships));

        tracing::debug!(node = %id, path = %slot.node.path, "node removed");
        Ok(slot.node)
    }

    fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id).map(|slot| &slot.node)
    }

    fn get_by_path(&self, path: &str) -> Option<&Node> {
        self.path_index.get(path).and_then(|id| self.get(id))
    }

    fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    fn all(&self) -> Vec<&Node> {
        self.order.values().filter_map(|id| self.get(id)).collect()
    }

    fn nodes_of_type(&self, node_type: NodeType) -> Vec<&Node> {
        let Some(bucket) = self.type_index.get(&node_type) else {
            return Vec::new();
        };
        let mut slots: Vec<&Slot> = bucket.iter().filter_map(|id| self.nodes.get(id)).collect();
        slots.sort_by_key(|slot| slot.ordinal);
        slots.into_iter().map(|slot| &slot.node).collect()
    }

    fn incoming(&self, target: &NodeId) -> Vec<(&NodeId, RelationshipType)> {
        self.reverse
            .get(target)
            .into_iter()
            .flat_map(|sources| {
                sources
                    .iter()
                    .flat_map(|(source, kinds)| kinds.iter().map(move |kind| (source, *kind)))
            })
            .collect()
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn relationship_count(&self) -> usize {
        self.nodes
            .values()
            .map(|slot| slot.node.relationships.len())
            .sum()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn file(id: &str, path: &str) -> Node {
        Node::new(id, path, path.rsplit('/').next().unwrap_or(path), NodeType::SourceFile)
    }

    #[test]
    fn add_and_lookup_by_id_and_path() {
        let mut graph = Graph::new();
        graph.add(file("f1", "/proj/a.swift")).expect("add");

        let by_id = graph.get(&NodeId::new("f1")).expect("by id");
        assert_eq!(by_id.path, "/proj/a.swift");
        let by_path = graph.get_by_path("/proj/a.swift").expect("by path");
        assert_eq!(by_path.id, NodeId::new("f1"));
        assert!(graph.get(&NodeId::new("nope")).is_none());
        assert!(graph.get_by_path("/nope").is_none());
    }

    #[test]
    fn duplicate_id_rejected_without_side_effects() {
        let mut graph = Graph::new();
        graph.add(file("f1", "/a")).expect("add");

        let result = graph.add(file("f1", "/b"));
        assert!(matches!(result, Err(SemgraphError::DuplicateId(_))));
        assert!(graph.get_by_path("/b").is_none());
        assert_eq!(graph.node_count(), 1);
        assert!(graph.check_consistency().is_empty());
    }

    #[test]
    fn duplicate_path_rejected_without_side_effects() {
        let mut graph = Graph::new();
        graph.add(file("f1", "/a")).expect("add");

        let result = graph.add(file("f2", "/a").with_relationship(NodeRelationship::contains("f1")));
        assert!(matches!(result, Err(SemgraphError::DuplicatePath(_))));
        assert!(graph.get(&NodeId::new("f2")).is_none());
        assert!(graph.incoming(&NodeId::new("f1")).is_empty());
        assert!(graph.check_consistency().is_empty());
    }

    #[test]
    fn add_records_reverse_adjacency() {
        let mut graph = Graph::new();
        graph
            .add(
                Node::new("p1", "/proj", "proj", NodeType::Project)
                    .with_relationship(NodeRelationship::contains("f1")),
            )
            .expect("add");
        graph.add(file("f1", "/proj/a.swift")).expect("add");

        let incoming = graph.incoming(&NodeId::new("f1"));
        assert_eq!(incoming, vec![(&NodeId::new("p1"), RelationshipType::Contains)]);
    }

    #[test]
    fn update_diffs_relationships() {
        let mut graph = Graph::new();
        graph
            .add(
                file("a", "/a")
                    .with_relationship(NodeRelationship::depends_on("b"))
                    .with_relationship(NodeRelationship::depends_on("c")),
            )
            .expect("add");
        graph.add(file("b", "/b")).expect("add");
        graph.add(file("c", "/c")).expect("add");
        graph.add(file("d", "/d")).expect("add");

        let mut changed = graph.get(&NodeId::new("a")).cloned().expect("a");
        changed.relationships = vec![
            NodeRelationship::depends_on("c"),
            NodeRelationship::depends_on("d"),
        ];
        graph.update(changed).expect("update");

        assert!(graph.incoming(&NodeId::new("b")).is_empty());
        assert_eq!(graph.incoming(&NodeId::new("c")).len(), 1);
        assert_eq!(graph.incoming(&NodeId::new("d")).len(), 1);
        assert!(graph.check_consistency().is_empty());
    }

    #[test]
    fn update_moves_path_and_type() {
        let mut graph = Graph::new();
        graph.add(file("a", "/a")).expect("add");

        let mut moved = graph.get(&NodeId::new("a")).cloned().expect("a");
        moved.path = "/renamed".to_string();
        moved.node_type = NodeType::Test;
        let old = graph.update(moved).expect("update");

        assert_eq!(old.path, "/a");
        assert!(graph.get_by_path("/a").is_none());
        assert!(graph.get_by_path("/renamed").is_some());
        assert!(graph.nodes_of_type(NodeType::SourceFile).is_empty());
        assert_eq!(graph.nodes_of_type(NodeType::Test).len(), 1);
        assert!(graph.check_consistency().is_empty());
    }

    #[test]
    fn update_path_collision_leaves_state_unchanged() {
        let mut graph = Graph::new();
        graph.add(file("a", "/a")).expect("add");
        graph.add(file("b", "/b")).expect("add");

        let mut clash = graph.get(&NodeId::new("a")).cloned().expect("a");
        clash.path = "/b".to_string();
        clash.name = "changed".to_string();
        let result = graph.update(clash);

        assert!(matches!(result, Err(SemgraphError::DuplicatePath(_))));
        assert_eq!(graph.get(&NodeId::new("a")).map(|n| n.name.as_str()), Some("a"));
        assert_eq!(
            graph.get_by_path("/b").map(|n| n.id.clone()),
            Some(NodeId::new("b"))
        );
    }

    #[test]
    fn update_missing_node_fails() {
        let mut graph = Graph::new();
        let result = graph.update(file("ghost", "/ghost"));
        assert!(matches!(result, Err(SemgraphError::NotFound(_))));
    }

    #[test]
    fn update_keeps_insertion_position() {
        let mut graph = Graph::new();
        graph.add(file("a", "/a")).expect("add");
        graph.add(file("b", "/b")).expect("add");

        let mut a = graph.get(&NodeId::new("a")).cloned().expect("a");
        a.name = "renamed".to_string();
        graph.update(a).expect("update");

        let ids: Vec<_> = graph.all().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn remove_prunes_outgoing_reverse_entries() {
        let mut graph = Graph::new();
        graph
            .add(
                Node::new("p1", "/proj", "proj", NodeType::Project)
                    .with_relationship(NodeRelationship::contains("f1")),
            )
            .expect("add");
        graph.add(file("f1", "/proj/a.swift")).expect("add");

        let removed = graph.remove(&NodeId::new("p1")).expect("remove");
        assert_eq!(removed.id, NodeId::new("p1"));
        assert!(graph.incoming(&NodeId::new("f1")).is_empty());
        assert!(graph.get_by_path("/proj").is_none());
        assert!(graph.nodes_of_type(NodeType::Project).is_empty());
        assert!(graph.check_consistency().is_empty());
    }

    #[test]
    fn remove_twice_reports_not_found() {
        let mut graph = Graph::new();
        graph.add(file("a", "/a")).expect("add");

        graph.remove(&NodeId::new("a")).expect("first");
        let second = graph.remove(&NodeId::new("a"));
        assert!(matches!(second, Err(SemgraphError::NotFound(_))));
    }

    #[test]
    fn dangling_target_is_indexed_and_resolves_when_added() {
        let mut graph = Graph::new();
        graph
            .add(file("a", "/a").with_relationship(NodeRelationship::depends_on("later")))
            .expect("add");
        assert!(graph.check_consistency().is_empty());

        graph.add(file("later", "/later")).expect("add");
        assert_eq!(
            graph.incoming(&NodeId::new("later")),
            vec![(&NodeId::new("a"), RelationshipType::DependsOn)]
        );
    }

    #[test]
    fn relationship_count_sums_forward_edges() {
        let mut graph = Graph::new();
        graph
            .add(
                file("a", "/a")
                    .with_relationship(NodeRelationship::depends_on("b"))
                    .with_relationship(NodeRelationship::contains("b")),
            )
            .expect("add");
        graph.add(file("b", "/b")).expect("add");
        assert_eq!(graph.relationship_count(), 2);
        assert_eq!(graph.incoming(&NodeId::new("b")).len(), 2);
    }

    #[test]
    fn fresh_id_skips_taken_ids() {
        let mut graph = Graph::new();
        let first = graph.fresh_id();
        graph.add(file(first.as_str(), "/x")).expect("add");

        let second = graph.fresh_id();
        assert_ne!(first, second);
        assert!(!graph.contains(&second));
    }
}
