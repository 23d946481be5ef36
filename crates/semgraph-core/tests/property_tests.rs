//! # Property-Based Tests
//!
//! Invariants of the graph store under arbitrary mutation sequences, and of
//! similarity ranking under arbitrary vectors.

#![allow(clippy::float_arithmetic)]

use proptest::collection::vec;
use proptest::prelude::*;
use semgraph_core::{
    Graph, GraphStore, Node, NodeId, NodeRelationship, NodeType, QueryEngine, RelationshipType,
    SemgraphError, cosine_similarity,
};
use std::collections::BTreeSet;

// =============================================================================
// STRATEGIES
// =============================================================================

/// Small pools so ids, paths and targets collide often.
const ID_POOL: u8 = 8;
const PATH_POOL: u8 = 6;

#[derive(Debug, Clone)]
enum Op {
    Add {
        id: u8,
        path: u8,
        node_type: NodeType,
        edges: Vec<(RelationshipType, u8)>,
    },
    Update {
        id: u8,
        path: u8,
        edges: Vec<(RelationshipType, u8)>,
    },
    Remove {
        id: u8,
    },
}

fn relationship_type() -> impl Strategy<Value = RelationshipType> {
    prop::sample::select(vec![
        RelationshipType::Contains,
        RelationshipType::DependsOn,
        RelationshipType::Imports,
        RelationshipType::Uses,
        RelationshipType::References,
    ])
}

fn node_type() -> impl Strategy<Value = NodeType> {
    prop::sample::select(NodeType::ALL.to_vec())
}

fn edges() -> impl Strategy<Value = Vec<(RelationshipType, u8)>> {
    vec((relationship_type(), 0..ID_POOL), 0..5)
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..ID_POOL, 0..PATH_POOL, node_type(), edges())
            .prop_map(|(id, path, node_type, edges)| Op::Add { id, path, node_type, edges }),
        2 => (0..ID_POOL, 0..PATH_POOL, edges())
            .prop_map(|(id, path, edges)| Op::Update { id, path, edges }),
        1 => (0..ID_POOL).prop_map(|id| Op::Remove { id }),
    ]
}

fn id(n: u8) -> NodeId {
    NodeId::new(format!("n{n}"))
}

fn build(n: u8, path: u8, node_type: NodeType, edges: &[(RelationshipType, u8)]) -> Node {
    edges.iter().fold(
        Node::new(id(n), format!("/p{path}"), format!("n{n}"), node_type),
        |node, (kind, target)| node.with_relationship(NodeRelationship::new(*kind, id(*target))),
    )
}

/// Apply one op. Errors are expected outcomes; the store must survive them.
fn apply(graph: &mut Graph, op: &Op) -> Result<(), SemgraphError> {
    match op {
        Op::Add {
            id: n,
            path,
            node_type,
            edges,
        } => graph.add(build(*n, *path, *node_type, edges)),
        Op::Update { id: n, path, edges } => {
            let node_type = graph
                .get(&id(*n))
                .map_or(NodeType::Unknown, |node| node.node_type);
            graph.update(build(*n, *path, node_type, edges)).map(|_| ())
        }
        Op::Remove { id: n } => graph.remove(&id(*n)).map(|_| ()),
    }
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Every index agrees with the primary map after any op sequence.
    #[test]
    fn indexes_stay_consistent(ops in vec(op(), 1..60)) {
        let mut graph = Graph::new();
        for op in &ops {
            let _ = apply(&mut graph, op);
            let violations = graph.check_consistency();
            prop_assert!(violations.is_empty(), "{:?} after {:?}", violations, op);
        }
    }

    /// No two live nodes share an id or a path.
    #[test]
    fn ids_and_paths_stay_unique(ops in vec(op(), 1..60)) {
        let mut graph = Graph::new();
        for op in &ops {
            let _ = apply(&mut graph, op);
        }

        let all = graph.all();
        let ids: BTreeSet<_> = all.iter().map(|n| &n.id).collect();
        let paths: BTreeSet<_> = all.iter().map(|n| n.path.as_str()).collect();
        prop_assert_eq!(ids.len(), all.len());
        prop_assert_eq!(paths.len(), all.len());
        prop_assert_eq!(graph.node_count(), all.len());
    }

    /// A failed mutation changes nothing.
    #[test]
    fn failed_mutations_are_side_effect_free(ops in vec(op(), 1..40)) {
        let mut graph = Graph::new();
        for op in &ops {
            let before: Vec<Node> = graph.all().into_iter().cloned().collect();
            if apply(&mut graph, op).is_err() {
                let after: Vec<Node> = graph.all().into_iter().cloned().collect();
                prop_assert_eq!(before, after);
            }
        }
    }

    /// After removal, the node is gone from every lookup and no reverse
    /// entry names it as a source.
    #[test]
    fn removal_prunes_everything(ops in vec(op(), 1..40), victim in 0..ID_POOL) {
        let mut graph = Graph::new();
        for op in &ops {
            let _ = apply(&mut graph, op);
        }
        let Some(removed) = graph.get(&id(victim)).cloned() else {
            return Ok(());
        };

        graph.remove(&removed.id).expect("remove live node");

        prop_assert!(!graph.contains(&removed.id));
        prop_assert!(graph.get_by_path(&removed.path).is_none());
        prop_assert!(graph.nodes_of_type(removed.node_type).iter().all(|n| n.id != removed.id));
        for n in 0..ID_POOL {
            prop_assert!(graph.incoming(&id(n)).iter().all(|(source, _)| **source != removed.id));
        }
        prop_assert!(graph.check_consistency().is_empty());
    }

    /// Traversals terminate and respect their bounds on arbitrary graphs,
    /// cycles included.
    #[test]
    fn traversals_terminate(ops in vec(op(), 1..60), start in 0..ID_POOL) {
        let mut graph = Graph::new();
        for op in &ops {
            let _ = apply(&mut graph, op);
        }
        let engine = QueryEngine::new(&graph);

        let path = engine.path_to_root(&id(start));
        prop_assert!(path.len() <= graph.node_count() + 1);

        let subtree = engine.subtree(&id(start));
        let unique: BTreeSet<_> = subtree.iter().map(|n| &n.id).collect();
        prop_assert_eq!(unique.len(), subtree.len());

        for cycle in engine.detect_cycles() {
            prop_assert!(!cycle.is_empty());
            for member in &cycle {
                prop_assert!(graph.contains(member));
            }
        }
    }

    /// A non-zero vector is maximally similar to itself.
    #[test]
    fn self_similarity_is_one(v in vec(-100.0f32..100.0, 1..64)) {
        prop_assume!(v.iter().any(|x| *x != 0.0));
        let score = cosine_similarity(&v, &v).expect("same length");
        prop_assert!((score - 1.0).abs() < 1e-4);
    }

    /// Cosine similarity is symmetric and bounded.
    #[test]
    fn similarity_symmetric_and_bounded(
        pair in (1usize..32).prop_flat_map(|n| (vec(-10.0f32..10.0, n), vec(-10.0f32..10.0, n)))
    ) {
        let (a, b) = pair;
        let ab = cosine_similarity(&a, &b).expect("same length");
        let ba = cosine_similarity(&b, &a).expect("same length");
        prop_assert!((ab - ba).abs() < 1e-6);
        prop_assert!((-1.0001..=1.0001).contains(&ab));
    }

    /// find_similar returns scores in non-increasing order and honors limit.
    #[test]
    fn similarity_ranking_is_ordered(
        vectors in vec(vec(-1.0f32..1.0, 4), 2..20),
        limit in 1usize..10
    ) {
        let mut graph = Graph::new();
        for (i, vector) in vectors.into_iter().enumerate() {
            graph
                .add(Node::new(format!("e{i}"), format!("/e{i}"), "e", NodeType::Data)
                    .with_embedding(vector, "test"))
                .expect("add");
        }

        let similar = QueryEngine::new(&graph).find_similar(&NodeId::new("e0"), limit);
        prop_assert!(similar.len() <= limit);
        prop_assert!(similar.iter().all(|s| s.node.id.as_str() != "e0"));
        for pair in similar.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
    }
}
