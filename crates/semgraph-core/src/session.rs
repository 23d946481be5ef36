//! # Session Module
//!
//! Lock-mediated ownership of a `Graph`.
//!
//! - Every mutation takes the write lock, so index updates never interleave
//! - Reads share the read lock and always observe a committed state
//! - Nodes handed out are clones; no reference outlives the lock
//! - Regeneration requests are forwarded after the write lock is released
//!
//! A session is constructed explicitly and passed by reference (or in an
//! `Arc`) to whoever needs it. There is no global instance.

use crate::cascade::LayerChange;
use crate::config::EngineConfig;
use crate::graph::{Graph, GraphStore};
use crate::ingestor::Ingestor;
use crate::mutation::{CascadeCoordinator, CascadeOutcome, RegenerationSink};
use crate::query::{Query, QueryEngine, QueryResult};
use crate::stats::{DanglingReference, GraphStats, dangling_references};
use crate::{Node, NodeId, SemgraphError};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A Session owns the graph and serializes its mutations.
#[derive(Default)]
pub struct Session {
    /// The graph, behind a single-writer/many-reader lock.
    graph: RwLock<Graph>,
    /// Engine tuning.
    config: EngineConfig,
    /// Where cascade invalidations are forwarded, if anywhere.
    sink: Option<Arc<dyn RegenerationSink>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("graph", &self.graph)
            .field("config", &self.config)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl Session {
    /// Create a new empty session with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty session with a configuration.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Create a session around an existing graph.
    #[must_use]
    pub fn with_graph(graph: Graph) -> Self {
        Self {
            graph: RwLock::new(graph),
            ..Self::default()
        }
    }

    /// Attach a regeneration sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn RegenerationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// The session's configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn read_graph(&self) -> Result<RwLockReadGuard<'_, Graph>, SemgraphError> {
        self.graph.read().map_err(|_| SemgraphError::LockPoisoned)
    }

    fn write_graph(&self) -> Result<RwLockWriteGuard<'_, Graph>, SemgraphError> {
        self.graph.write().map_err(|_| SemgraphError::LockPoisoned)
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Validate and insert a node.
    pub fn add(&self, node: Node) -> Result<NodeId, SemgraphError> {
        let mut graph = self.write_graph()?;
        Ingestor::ingest(&mut *graph, node)
    }

    /// Validate and insert a batch; nothing is inserted if any node fails.
    pub fn ingest_batch(&self, nodes: Vec<Node>) -> Result<Vec<NodeId>, SemgraphError> {
        let mut graph = self.write_graph()?;
        Ingestor::ingest_batch(&mut *graph, nodes)
    }

    /// Validate and replace a node. Returns the previous value.
    pub fn update(&self, node: Node) -> Result<Node, SemgraphError> {
        Ingestor::validate(&node)?;
        let mut graph = self.write_graph()?;
        graph.update(node)
    }

    /// Remove a node. Returns the removed value.
    pub fn remove(&self, id: &NodeId) -> Result<Node, SemgraphError> {
        let mut graph = self.write_graph()?;
        graph.remove(id)
    }

    /// Move a node to a new path.
    pub fn move_node(
        &self,
        id: &NodeId,
        new_path: impl Into<String>,
    ) -> Result<Node, SemgraphError> {
        let mut graph = self.write_graph()?;
        CascadeCoordinator::move_node(&mut *graph, id, new_path)
    }

    /// Change one representation layer and clear its dependents.
    ///
    /// If the cascade invalidated anything, the regeneration request is
    /// forwarded to the sink once the write lock has been released.
    pub fn apply_layer_change(
        &self,
        id: &NodeId,
        change: LayerChange,
    ) -> Result<CascadeOutcome, SemgraphError> {
        let outcome = {
            let mut graph = self.write_graph()?;
            CascadeCoordinator::apply_layer_change(&mut *graph, id, change)?
        };

        if let Some(request) = &outcome.regeneration {
            match (&self.sink, self.config.enqueue_regeneration) {
                (Some(sink), true) => sink.request_regeneration(request.clone()),
                (None, true) => tracing::warn!(
                    node = %request.node_id,
                    layers = request.layers.len(),
                    "no regeneration sink, request dropped"
                ),
                (_, false) => {}
            }
        }

        Ok(outcome)
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Lookup by id.
    pub fn get(&self, id: &NodeId) -> Result<Option<Node>, SemgraphError> {
        Ok(self.read_graph()?.get(id).cloned())
    }

    /// Lookup by path.
    pub fn get_by_path(&self, path: &str) -> Result<Option<Node>, SemgraphError> {
        Ok(self.read_graph()?.get_by_path(path).cloned())
    }

    /// Full snapshot in insertion order.
    pub fn all(&self) -> Result<Vec<Node>, SemgraphError> {
        Ok(self.read_graph()?.all().into_iter().cloned().collect())
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> Result<usize, SemgraphError> {
        Ok(self.read_graph()?.node_count())
    }

    /// Run a closure against a query engine under the read lock.
    pub fn read<T>(&self, f: impl FnOnce(&QueryEngine<'_, Graph>) -> T) -> Result<T, SemgraphError> {
        let graph = self.read_graph()?;
        let engine = QueryEngine::with_config(&*graph, &self.config);
        Ok(f(&engine))
    }

    /// Answer a structured query.
    pub fn execute(&self, query: &Query) -> Result<QueryResult, SemgraphError> {
        self.read(|engine| engine.execute(query))
    }

    /// Statistics snapshot.
    pub fn stats(&self) -> Result<GraphStats, SemgraphError> {
        Ok(GraphStats::from_store(&*self.read_graph()?))
    }

    /// Report every relationship whose target is not live, logging each.
    pub fn validate_references(&self) -> Result<Vec<DanglingReference>, SemgraphError> {
        let dangling = dangling_references(&*self.read_graph()?);
        for reference in &dangling {
            tracing::warn!(
                source = %reference.source,
                kind = %reference.relationship.kind,
                target = %reference.relationship.target_id,
                "dangling relationship"
            );
        }
        Ok(dangling)
    }
}

// =============================================================================
// TESTS
// =============================================================================
