//! # Query Module
//!
//! Read-only algorithms over a consistent `GraphStore`, plus the structured
//! request types callers translate classified intents into.
//!
//! - Queries never fail: unknown ids and dangling targets yield empty
//!   results or `None`.
//! - Every unbounded walk carries its own termination guard (visited set
//!   and/or depth bound), independent of any locking.
//! - Capability lookup is a linear filter. The capability set is small and
//!   queried rarely, so no index is maintained for it.

use crate::config::EngineConfig;
use crate::graph::GraphStore;
use crate::primitives::{DEFAULT_MAX_TRAVERSAL_DEPTH, DEFAULT_SIMILARITY_LIMIT};
use crate::similarity::{SimilarNode, rank_by_similarity};
use crate::{Capability, Node, NodeId, NodeType, RelationshipType};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

// =============================================================================
// STRUCTURED REQUESTS
// =============================================================================

/// Query operation types supported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryType {
    /// Lookup a node by id.
    Lookup(NodeId),

    /// Lookup a node by path.
    LookupPath(String),

    /// All nodes of a type.
    ByType(NodeType),

    /// All nodes carrying a capability.
    ByCapability(Capability),

    /// `contains` targets of a node.
    Children(NodeId),

    /// The node that `contains` this one.
    Parent(NodeId),

    /// Forward `dependsOn`/`imports`/`uses` targets.
    Dependencies(NodeId),

    /// Nodes with a `dependsOn`/`imports`/`uses` edge to this one.
    Dependents(NodeId),

    /// Case-insensitive substring search.
    Search(String),

    /// Nodes ranked by embedding similarity.
    FindSimilar(NodeId),

    /// Ancestors, root first, ending at the node itself.
    PathToRoot(NodeId),

    /// Breadth-first `contains` closure, starting node first.
    Subtree(NodeId),

    /// All `dependsOn` cycles.
    DetectCycles,
}

/// A structured query with an optional result limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// The type of query operation.
    pub query_type: QueryType,
    /// Maximum number of results. `FindSimilar` falls back to the configured
    /// default when absent; other queries are unlimited.
    pub limit: Option<usize>,
}

impl Query {
    /// Create a new query with no limit.
    #[must_use]
    pub fn new(query_type: QueryType) -> Self {
        Self {
            query_type,
            limit: None,
        }
    }

    /// Create a new query with a limit.
    #[must_use]
    pub fn with_limit(query_type: QueryType, limit: usize) -> Self {
        Self {
            query_type,
            limit: Some(limit),
        }
    }

    /// Lookup helper.
    #[must_use]
    pub fn lookup(id: impl Into<NodeId>) -> Self {
        Self::new(QueryType::Lookup(id.into()))
    }

    /// Search helper.
    #[must_use]
    pub fn search(text: impl Into<String>) -> Self {
        Self::new(QueryType::Search(text.into()))
    }

    /// Similarity helper.
    #[must_use]
    pub fn similar(id: impl Into<NodeId>, limit: usize) -> Self {
        Self::with_limit(QueryType::FindSimilar(id.into()), limit)
    }
}

/// The answer to a [`Query`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryResult {
    Node(Option<Node>),
    Nodes(Vec<Node>),
    Similar(Vec<SimilarNode>),
    Cycles(Vec<Vec<NodeId>>),
}

impl QueryResult {
    /// Number of items in the result.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            QueryResult::Node(node) => usize::from(node.is_some()),
            QueryResult::Nodes(nodes) => nodes.len(),
            QueryResult::Similar(similar) => similar.len(),
            QueryResult::Cycles(cycles) => cycles.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// QUERY ENGINE
// =============================================================================

/// Read-only algorithms borrowed over a graph store.
#[derive(Debug)]
pub struct QueryEngine<'g, G: GraphStore> {
    graph: &'g G,
    max_depth: usize,
    default_similarity_limit: usize,
}

impl<'g, G: GraphStore> QueryEngine<'g, G> {
    /// Engine with the compiled-in defaults.
    #[must_use]
    pub fn new(graph: &'g G) -> Self {
        Self {
            graph,
            max_depth: DEFAULT_MAX_TRAVERSAL_DEPTH,
            default_similarity_limit: DEFAULT_SIMILARITY_LIMIT,
        }
    }

    /// Engine tuned by a configuration.
    #[must_use]
    pub fn with_config(graph: &'g G, config: &EngineConfig) -> Self {
        Self {
            graph,
            max_depth: config.max_traversal_depth,
            default_similarity_limit: config.default_similarity_limit,
        }
    }

    /// Nodes of a type, via the type index.
    pub fn by_type(&self, node_type: NodeType) -> Vec<&'g Node> {
        self.graph.nodes_of_type(node_type)
    }

    /// Nodes carrying a capability. Linear scan, no index.
    pub fn by_capability(&self, capability: Capability) -> Vec<&'g Node> {
        self.graph
            .all()
            .into_iter()
            .filter(|node| node.has_capability(capability))
            .collect()
    }

    /// Live `contains` targets of `of`, in relationship order.
    pub fn children(&self, of: &NodeId) -> Vec<&'g Node> {
        let Some(node) = self.graph.get(of) else {
            return Vec::new();
        };
        node.targets_of(RelationshipType::Contains)
            .filter_map(|target| self.graph.get(target))
            .collect()
    }

    /// The live node whose `contains` relationship targets `of`.
    ///
    /// At most one such parent is expected; if the data holds several,
    /// the first in id order wins.
    pub fn parent(&self, of: &NodeId) -> Option<&'g Node> {
        self.graph
            .incoming(of)
            .into_iter()
            .filter(|(_, kind)| *kind == RelationshipType::Contains)
            .find_map(|(source, _)| self.graph.get(source))
    }

    /// Live dependency targets of `of`, deduplicated, in relationship order.
    pub fn dependencies(&self, of: &NodeId) -> Vec<&'g Node> {
        let Some(node) = self.graph.get(of) else {
            return Vec::new();
        };
        let mut seen = BTreeSet::new();
        let mut targets = Vec::new();
        for rel in node.relationships.iter().filter(|r| r.kind.is_dependency()) {
            if !seen.insert(&rel.target_id) {
                continue;
            }
            if let Some(target) = self.graph.get(&rel.target_id) {
                targets.push(target);
            }
        }
        targets
    }

    /// Live nodes with a dependency edge to `of`, deduplicated.
    pub fn dependents(&self, of: &NodeId) -> Vec<&'g Node> {
        let mut seen = BTreeSet::new();
        self.graph
            .incoming(of)
            .into_iter()
            .filter(|(_, kind)| kind.is_dependency())
            .filter(|(source, _)| seen.insert(*source))
            .filter_map(|(source, _)| self.graph.get(source))
            .collect()
    }

    /// Case-insensitive substring match over name, path, tags and indexed text.
    ///
    /// A blank query matches nothing.
    pub fn search(&self, query: &str) -> Vec<&'g Node> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        let needle = query.to_lowercase();
        self.graph
            .all()
            .into_iter()
            .filter(|node| matches_text(node, &needle))
            .collect()
    }

    /// Nodes most similar to `to` by embedding, best first.
    ///
    /// Empty if `to` is unknown or has no embedding.
    pub fn find_similar(&self, to: &NodeId, limit: usize) -> Vec<SimilarNode> {
        let Some(source) = self.graph.get(to) else {
            return Vec::new();
        };
        let Some(query) = source.embedding() else {
            return Vec::new();
        };
        let candidates = self
            .graph
            .all()
            .into_iter()
            .filter(|node| node.id != source.id);
        rank_by_similarity(query, candidates, limit)
    }

    /// Ancestors of `from`, root first, ending with `from` itself.
    ///
    /// Stops at the first repeated ancestor and never walks more than
    /// `node_count + 1` steps (or the configured depth), so a `contains`
    /// cycle truncates the path instead of hanging.
    pub fn path_to_root(&self, from: &NodeId) -> Vec<&'g Node> {
        let Some(start) = self.graph.get(from) else {
            return Vec::new();
        };
        let bound = self
            .graph
            .node_count()
            .saturating_add(1)
            .min(self.max_depth);

        let mut chain = vec![start];
        let mut seen: BTreeSet<&NodeId> = BTreeSet::from([&start.id]);
        let mut current = start;
        while let Some(parent) = self.parent(&current.id) {
            if chain.len() >= bound || !seen.insert(&parent.id) {
                tracing::trace!(node = %from, steps = chain.len(), "path_to_root truncated");
                break;
            }
            chain.push(parent);
            current = parent;
        }

        chain.reverse();
        chain
    }

    /// Breadth-first `contains` closure of `from`, starting node first.
    pub fn subtree(&self, from: &NodeId) -> Vec<&'g Node> {
        let Some(start) = self.graph.get(from) else {
            return Vec::new();
        };

        let mut visited: BTreeSet<&NodeId> = BTreeSet::from([&start.id]);
        let mut queue = VecDeque::from([(start, 0usize)]);
        let mut result = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            result.push(current);
            if depth >= self.max_depth {
                tracing::trace!(node = %current.id, depth, "subtree depth bound reached");
                continue;
            }
            for child in self.children(&current.id) {
                if visited.insert(&child.id) {
                    queue.push_back((child, depth.saturating_add(1)));
                }
            }
        }

        result
    }

    /// Every `dependsOn` cycle, each as the path slice from the re-entered
    /// node to the node that closed the loop.
    ///
    /// One depth-first pass over all unvisited nodes in insertion order,
    /// run on an explicit stack. Dangling targets are skipped, and a
    /// `dependsOn` edge listed more than once is followed once.
    pub fn detect_cycles(&self) -> Vec<Vec<NodeId>> {
        let mut visited: BTreeSet<&NodeId> = BTreeSet::new();
        let mut cycles = Vec::new();

        for root in self.graph.all() {
            if !visited.insert(&root.id) {
                continue;
            }

            let mut stack: Vec<(&'g Node, usize)> = vec![(root, 0)];
            let mut on_stack: BTreeMap<&NodeId, usize> = BTreeMap::from([(&root.id, 0)]);

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                let next = node
                    .relationships
                    .iter()
                    .enumerate()
                    .skip(frame.1)
                    .find(|(_, rel)| rel.kind == RelationshipType::DependsOn);

                let Some((index, rel)) = next else {
                    on_stack.remove(&node.id);
                    stack.pop();
                    continue;
                };
                frame.1 = index.saturating_add(1);

                // A repeated edge was already followed from this frame.
                let repeated = node.relationships.iter().take(index).any(|earlier| {
                    earlier.kind == RelationshipType::DependsOn
                        && earlier.target_id == rel.target_id
                });
                if repeated {
                    continue;
                }

                let Some(target) = self.graph.get(&rel.target_id) else {
                    continue;
                };
                if let Some(&position) = on_stack.get(&target.id) {
                    if let Some(slice) = stack.get(position..) {
                        cycles.push(slice.iter().map(|(n, _)| n.id.clone()).collect());
                    }
                } else if visited.insert(&target.id) {
                    on_stack.insert(&target.id, stack.len());
                    stack.push((target, 0));
                }
            }
        }

        cycles
    }

    /// Answer a structured query.
    pub fn execute(&self, query: &Query) -> QueryResult {
        let limit = query.limit;
        let nodes = |found: Vec<&'g Node>| {
            let take = limit.unwrap_or(found.len());
            QueryResult::Nodes(found.into_iter().take(take).cloned().collect())
        };

        match &query.query_type {
            QueryType::Lookup(id) => QueryResult::Node(self.graph.get(id).cloned()),
            QueryType::LookupPath(path) => QueryResult::Node(self.graph.get_by_path(path).cloned()),
            QueryType::ByType(node_type) => nodes(self.by_type(*node_type)),
            QueryType::ByCapability(capability) => nodes(self.by_capability(*capability)),
            QueryType::Children(id) => nodes(self.children(id)),
            QueryType::Parent(id) => QueryResult::Node(self.parent(id).cloned()),
            QueryType::Dependencies(id) => nodes(self.dependencies(id)),
            QueryType::Dependents(id) => nodes(self.dependents(id)),
            QueryType::Search(text) => nodes(self.search(text)),
            QueryType::FindSimilar(id) => QueryResult::Similar(
                self.find_similar(id, limit.unwrap_or(self.default_similarity_limit)),
            ),
            QueryType::PathToRoot(id) => nodes(self.path_to_root(id)),
            QueryType::Subtree(id) => nodes(self.subtree(id)),
            QueryType::DetectCycles => QueryResult::Cycles(self.detect_cycles()),
        }
    }
}

/// Whether any text field of `node` contains the lowercased `needle`.
///
/// Search is a linear scan over every live node; at workspace scale that is
/// an accepted cost. ASCII fields are compared in place, and only non-ASCII
/// fields are lowercased into a fresh string. Fields are tried in order and
/// the first hit ends the scan for that node.
fn matches_text(node: &Node, needle: &str) -> bool {
    let hit = |haystack: &str| contains_ignore_case(haystack, needle);

    hit(&node.name)
        || hit(&node.path)
        || node.metadata.tags.iter().any(|tag| hit(tag))
        || node
            .representations
            .indexed
            .as_ref()
            .is_some_and(|indexed| hit(&indexed.searchable_text))
}

/// Case-insensitive substring test against an already lowercased needle.
fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    if haystack.is_ascii() {
        return haystack
            .as_bytes()
            .windows(needle.len())
            .any(|window| window.eq_ignore_ascii_case(needle.as_bytes()));
    }
    haystack.to_lowercase().contains(needle)
}

// =============================================================================
// TESTS
// =============================================================================
