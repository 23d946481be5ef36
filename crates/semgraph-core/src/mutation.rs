//! # Cascade Coordinator
//!
//! Multi-layer mutations for the semantic graph.
//!
//! A change to one representation layer is expanded, through the fixed
//! policy in [`crate::cascade`], into a full replacement node whose
//! dependent layers are cleared. The replacement is then submitted to the
//! store's `update`, so the graph never serves a stale `indexed` or
//! `humanReadable` value after a content edit: a layer is either current
//! or explicitly absent.
//!
//! Recomputing cleared layers is the job of external producers (parser,
//! summarizer, embedder). The coordinator only tells them what went stale,
//! through a [`RegenerationRequest`].

use crate::cascade::{LayerChange, RepresentationLayer};
use crate::graph::GraphStore;
use crate::ingestor::Ingestor;
use crate::{Node, NodeId, SemgraphError};
use std::collections::{BTreeSet, VecDeque};
use std::sync::{Mutex, PoisonError};

// =============================================================================
// REGENERATION NOTIFICATIONS
// =============================================================================

/// Layers of one node that were cleared and should be produced again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegenerationRequest {
    pub node_id: NodeId,
    pub layers: Vec<RepresentationLayer>,
}

impl RegenerationRequest {
    /// Add `layers` to this request, keeping pipeline order without repeats.
    fn merge(&mut self, layers: &[RepresentationLayer]) {
        let wanted: BTreeSet<RepresentationLayer> =
            self.layers.iter().chain(layers).copied().collect();
        self.layers = wanted.into_iter().collect();
    }
}

/// Receiver of regeneration requests.
///
/// # Extension Point
///
/// Implemented by whatever schedules the external producers. Called
/// outside the session's write lock; implementations must not block for
/// long and must be `Send + Sync`.
pub trait RegenerationSink: Send + Sync {
    fn request_regeneration(&self, request: RegenerationRequest);
}

/// FIFO sink that producers drain at their own pace.
///
/// At most one request per node is pending. A later request for a queued
/// node is merged into it, so no cleared layer is forgotten before a
/// producer drains the queue.
#[derive(Debug, Default)]
pub struct RegenerationQueue {
    pending: Mutex<VecDeque<RegenerationRequest>>,
}

impl RegenerationQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every pending request, oldest first.
    pub fn drain(&self) -> Vec<RegenerationRequest> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.drain(..).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RegenerationSink for RegenerationQueue {
    fn request_regeneration(&self, request: RegenerationRequest) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        // A node already queued keeps its position and gains the new layers.
        match pending
            .iter_mut()
            .find(|queued| queued.node_id == request.node_id)
        {
            Some(queued) => queued.merge(&request.layers),
            None => pending.push_back(request),
        }
    }
}

// =============================================================================
// COORDINATOR
// =============================================================================

/// Result of a committed layer change.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeOutcome {
    /// The node as now stored.
    pub node: Node,
    /// Layers cleared by the cascade.
    pub invalidated: &'static [RepresentationLayer],
    /// What to regenerate, if anything.
    pub regeneration: Option<RegenerationRequest>,
}

/// The CascadeCoordinator routes layer changes and moves into store updates.
pub struct CascadeCoordinator;

impl CascadeCoordinator {
    /// Build the replacement node for a layer change without touching a store.
    #[must_use]
    pub fn cascade(node: &Node, change: LayerChange) -> (Node, &'static [RepresentationLayer]) {
        let mut replacement = node.clone();
        let invalidated = replacement.representations.apply_change(change);
        (replacement, invalidated)
    }

    /// Apply a change to one layer of `id` and clear its dependents.
    ///
    /// Fails with `NotFound` if `id` is not live, or `InvalidNode` if the
    /// new layer value does not pass ingest validation (e.g. a non-finite
    /// embedding). On failure the store is unchanged.
    pub fn apply_layer_change<G: GraphStore>(
        graph: &mut G,
        id: &NodeId,
        change: LayerChange,
    ) -> Result<CascadeOutcome, SemgraphError> {
        let Some(current) = graph.get(id) else {
            return Err(SemgraphError::NotFound(id.clone()));
        };
        let layer = change.layer();
        let (replacement, invalidated) = Self::cascade(current, change);
        Ingestor::validate(&replacement)?;

        // Nothing to rebuild from once the changed layer itself is gone.
        let regeneration = (!invalidated.is_empty()
            && replacement.representations.is_present(layer))
        .then(|| RegenerationRequest {
            node_id: id.clone(),
            layers: invalidated.to_vec(),
        });

        graph.update(replacement.clone())?;
        tracing::debug!(
            node = %id,
            layer = %layer,
            invalidated = invalidated.len(),
            "layer change cascaded"
        );

        Ok(CascadeOutcome {
            node: replacement,
            invalidated,
            regeneration,
        })
    }

    /// Move a node to a new path. The only sanctioned way to change `path`.
    ///
    /// Returns the node as now stored. Moving to the current path is a no-op.
    pub fn move_node<G: GraphStore>(
        graph: &mut G,
        id: &NodeId,
        new_path: impl Into<String>,
    ) -> Result<Node, SemgraphError> {
        let Some(current) = graph.get(id) else {
            return Err(SemgraphError::NotFound(id.clone()));
        };
        let new_path = new_path.into();
        if current.path == new_path {
            return Ok(current.clone());
        }

        let mut moved = current.clone();
        moved.path = new_path;
        Ingestor::validate(&moved)?;

        let old = graph.update(moved.clone())?;
        tracing::debug!(node = %id, from = %old.path, to = %moved.path, "node moved");
        Ok(moved)
    }
}

// =============================================================================
// TESTS
// =============================================================================
