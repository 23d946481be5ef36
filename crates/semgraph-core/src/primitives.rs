//! # Engine Primitives
//!
//! Compiled-in limits and defaults for the semantic graph engine.
//!
//! These are fixed at build time. Runtime tuning goes through
//! [`crate::EngineConfig`], which can move traversal bounds but not
//! remove them.

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of a node id in bytes.
pub const MAX_ID_LENGTH: usize = 512;

/// Maximum length of a node path in bytes.
///
/// Matches the common `PATH_MAX` of 4096.
pub const MAX_PATH_LENGTH: usize = 4096;

/// Maximum length of a node display name in bytes.
pub const MAX_NAME_LENGTH: usize = 1024;

/// Maximum number of forward relationships a single node may carry.
///
/// Prevents a single malformed producer record from blowing up the
/// reverse-adjacency index.
pub const MAX_RELATIONSHIPS_PER_NODE: usize = 10_000;

/// Maximum embedding dimension accepted on ingest.
pub const MAX_EMBEDDING_DIMENSION: usize = 8192;

/// Maximum number of nodes in a single batch ingest.
pub const MAX_BATCH_SIZE: usize = 100_000;

// =============================================================================
// TRAVERSAL DEFAULTS
// =============================================================================

/// Default hard cap on traversal depth (`subtree`, `path_to_root`).
///
/// `path_to_root` is additionally bounded by the live node count + 1.
pub const DEFAULT_MAX_TRAVERSAL_DEPTH: usize = 10_000;

/// Default number of results for similarity queries without an explicit limit.
pub const DEFAULT_SIMILARITY_LIMIT: usize = 10;

/// Prefix of system-generated node ids.
pub const GENERATED_ID_PREFIX: &str = "node-";
