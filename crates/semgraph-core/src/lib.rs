//! # semgraph-core
//!
//! The in-memory semantic graph engine behind a filesystem-aware workspace.
//!
//! Every file, directory, script or agent is a [`Node`] carrying a
//! five-layer representation bundle (raw bytes, parsed structure, search
//! index, human summary, embedding vector) and typed relationships to other
//! nodes. This crate owns the node collection, keeps its indexes consistent
//! across mutations, propagates content edits through the dependent layers,
//! and answers structural, textual and similarity queries.
//!
//! ## Architectural Constraints
//!
//! - In-memory only: no persistence, no network, no async
//! - Deterministic: all collections are `BTreeMap`/`BTreeSet`
//! - Mutations are atomic with respect to all indexes; failures leave the
//!   store untouched
//! - Reads never fail on absent ids or dangling relationship targets
//! - Producers (scanner, parser, embedder) live outside; they submit nodes
//!   and receive regeneration requests

// =============================================================================
// MODULES
// =============================================================================

pub mod cascade;
pub mod config;
pub mod graph;
pub mod ingestor;
pub mod mutation;
pub mod primitives;
pub mod query;
pub mod session;
pub mod similarity;
pub mod stats;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Capability, EmbeddingRepresentation, HumanReadableRepresentation, IndexedRepresentation, Node,
    NodeId, NodeMetadata, NodeRelationship, NodeType, ParsedRepresentation, ParsedSymbol,
    RawRepresentation, RelationshipType, Representations, SemgraphError,
};

// =============================================================================
// RE-EXPORTS: Graph Engine
// =============================================================================

pub use cascade::{LayerChange, RepresentationLayer};
pub use config::EngineConfig;
pub use graph::{Graph, GraphStore};
pub use ingestor::Ingestor;
pub use mutation::{
    CascadeCoordinator, CascadeOutcome, RegenerationQueue, RegenerationRequest, RegenerationSink,
};
pub use query::{Query, QueryEngine, QueryResult, QueryType};
pub use session::Session;
pub use similarity::{SimilarNode, cosine_similarity};
pub use stats::{DanglingReference, GraphStats, dangling_references};
