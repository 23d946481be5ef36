//! # Graph Statistics
//!
//! Informational counts over a store and a validation pass for relationship
//! targets that are not (or no longer) live.
//!
//! Dangling targets are legal: producers may emit edges to nodes that arrive
//! later, and removal does not rewrite other nodes. The pass only reports
//! them.

use crate::graph::GraphStore;
use crate::{NodeId, NodeRelationship, NodeType};
use serde::Serialize;
use std::collections::BTreeMap;

// =============================================================================
// GRAPH STATS
// =============================================================================

/// Size and shape of a graph.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct GraphStats {
    /// Number of live nodes.
    pub node_count: usize,
    /// Forward relationships summed over all live nodes, dangling included.
    pub relationship_count: usize,
    /// Live nodes per type. Types with no nodes are absent.
    pub type_distribution: BTreeMap<NodeType, usize>,
}

impl GraphStats {
    /// Stats of an empty graph.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compute stats from a store.
    #[must_use]
    pub fn from_store<G: GraphStore>(graph: &G) -> Self {
        let type_distribution = NodeType::ALL
            .into_iter()
            .filter_map(|node_type| {
                let count = graph.nodes_of_type(node_type).len();
                (count > 0).then_some((node_type, count))
            })
            .collect();

        Self {
            node_count: graph.node_count(),
            relationship_count: graph.relationship_count(),
            type_distribution,
        }
    }

    /// Number of nodes of one type.
    #[must_use]
    pub fn count_of(&self, node_type: NodeType) -> usize {
        self.type_distribution.get(&node_type).copied().unwrap_or(0)
    }
}

impl std::fmt::Display for GraphStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} nodes, {} relationships",
            self.node_count, self.relationship_count
        )
    }
}

// =============================================================================
// DANGLING REFERENCES
// =============================================================================

/// A relationship whose target is not a live node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingReference {
    pub source: NodeId,
    pub relationship: NodeRelationship,
}

/// Every relationship in the store whose target is not live, in insertion
/// order of the source and relationship order within it.
#[must_use]
pub fn dangling_references<G: GraphStore>(graph: &G) -> Vec<DanglingReference> {
    graph
        .all()
        .into_iter()
        .flat_map(|node| {
            node.relationships
                .iter()
                .filter(|rel| !graph.contains(&rel.target_id))
                .map(|rel| DanglingReference {
                    source: node.id.clone(),
                    relationship: rel.clone(),
                })
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Graph, Node, RelationshipType};

    #[test]
    fn empty_graph_stats() {
        let stats = GraphStats::from_store(&Graph::new());
        assert_eq!(stats, GraphStats::empty());
        assert_eq!(stats.to_string(), "0 nodes, 0 relationships");
    }

    #[test]
    fn stats_count_types_and_edges() {
        let mut graph = Graph::new();
        graph
            .add(
                Node::new("p", "/p", "p", NodeType::Project)
                    .with_relationship(NodeRelationship::contains("a"))
                    .with_relationship(NodeRelationship::contains("b")),
            )
            .expect("add");
        graph
            .add(Node::new("a", "/p/a.rs", "a.rs", NodeType::SourceFile))
            .expect("add");
        graph
            .add(Node::new("b", "/p/b.rs", "b.rs", NodeType::SourceFile))
            .expect("add");

        let stats = GraphStats::from_store(&graph);
        assert_eq!(stats.node_count, 3);
        assert_eq!(stats.relationship_count, 2);
        assert_eq!(stats.count_of(NodeType::SourceFile), 2);
        assert_eq!(stats.count_of(NodeType::Project), 1);
        assert_eq!(stats.count_of(NodeType::Agent), 0);
        assert!(!stats.type_distribution.contains_key(&NodeType::Agent));
    }

    #[test]
    fn dangling_references_reported_after_removal() {
        let mut graph = Graph::new();
        graph
            .add(
                Node::new("app", "/app", "app", NodeType::SourceFile)
                    .with_relationship(NodeRelationship::new(RelationshipType::Imports, "lib"))
                    .with_relationship(NodeRelationship::depends_on("cfg")),
            )
            .expect("add");
        graph
            .add(Node::new("lib", "/lib", "lib", NodeType::SourceFile))
            .expect("add");
        assert_eq!(dangling_references(&graph).len(), 1);

        graph.remove(&NodeId::new("lib")).expect("remove");
        let dangling = dangling_references(&graph);
        assert_eq!(dangling.len(), 2);
        assert!(dangling.iter().all(|d| d.source.as_str() == "app"));
        assert_eq!(dangling[0].relationship.target_id.as_str(), "lib");
    }
}
