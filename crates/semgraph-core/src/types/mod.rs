//! # Core Type Definitions
//!
//! This module contains the value types of the semantic graph:
//! - Node identity and classification (`NodeId`, `NodeType`, `Capability`)
//! - Typed, weak edges (`RelationshipType`, `NodeRelationship`)
//! - The five representation layers (`Representations`)
//! - Error types (`SemgraphError`)
//!
//! ## Ordering Guarantees
//!
//! Every enum here implements `Ord` so that it can key a `BTreeMap` or
//! `BTreeSet`. Indexes built on top of these types iterate deterministically.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

// =============================================================================
// NODE IDENTIFIER
// =============================================================================

/// Globally unique, immutable identifier of a node.
///
/// Ids are either supplied by the producer (scanner, chat action) or
/// generated by [`crate::Graph::fresh_id`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a node id from anything string-like.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// =============================================================================
// CLOSED ENUMERATIONS
// =============================================================================

/// What kind of entity a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    Project,
    Directory,
    SourceFile,
    Script,
    Command,
    Workflow,
    Agent,
    Asset,
    Document,
    Config,
    View,
    Model,
    Service,
    Test,
    Data,
    Unknown,
}

impl NodeType {
    /// Every node type, in declaration order.
    pub const ALL: [NodeType; 16] = [
        NodeType::Project,
        NodeType::Directory,
        NodeType::SourceFile,
        NodeType::Script,
        NodeType::Command,
        NodeType::Workflow,
        NodeType::Agent,
        NodeType::Asset,
        NodeType::Document,
        NodeType::Config,
        NodeType::View,
        NodeType::Model,
        NodeType::Service,
        NodeType::Test,
        NodeType::Data,
        NodeType::Unknown,
    ];

    /// Stable lowercase name, matching the serialized form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Project => "project",
            NodeType::Directory => "directory",
            NodeType::SourceFile => "sourceFile",
            NodeType::Script => "script",
            NodeType::Command => "command",
            NodeType::Workflow => "workflow",
            NodeType::Agent => "agent",
            NodeType::Asset => "asset",
            NodeType::Document => "document",
            NodeType::Config => "config",
            NodeType::View => "view",
            NodeType::Model => "model",
            NodeType::Service => "service",
            NodeType::Test => "test",
            NodeType::Data => "data",
            NodeType::Unknown => "unknown",
        }
    }

    /// Parse the serialized name back into a type (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operation a node supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    Viewable,
    Editable,
    Executable,
    Previewable,
    Indexable,
    Searchable,
    Explainable,
    Refactorable,
    Embeddable,
    Testable,
    Syncable,
    Versionable,
    Exportable,
}

impl Capability {
    /// Every capability, in declaration order.
    pub const ALL: [Capability; 13] = [
        Capability::Viewable,
        Capability::Editable,
        Capability::Executable,
        Capability::Previewable,
        Capability::Indexable,
        Capability::Searchable,
        Capability::Explainable,
        Capability::Refactorable,
        Capability::Embeddable,
        Capability::Testable,
        Capability::Syncable,
        Capability::Versionable,
        Capability::Exportable,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Viewable => "viewable",
            Capability::Editable => "editable",
            Capability::Executable => "executable",
            Capability::Previewable => "previewable",
            Capability::Indexable => "indexable",
            Capability::Searchable => "searchable",
            Capability::Explainable => "explainable",
            Capability::Refactorable => "refactorable",
            Capability::Embeddable => "embeddable",
            Capability::Testable => "testable",
            Capability::Syncable => "syncable",
            Capability::Versionable => "versionable",
            Capability::Exportable => "exportable",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of a directed relationship between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationshipType {
    Contains,
    DependsOn,
    Imports,
    Uses,
    Executes,
    Tests,
    Documents,
    Configures,
    References,
}

impl RelationshipType {
    /// Every relationship kind, in declaration order.
    pub const ALL: [RelationshipType; 9] = [
        RelationshipType::Contains,
        RelationshipType::DependsOn,
        RelationshipType::Imports,
        RelationshipType::Uses,
        RelationshipType::Executes,
        RelationshipType::Tests,
        RelationshipType::Documents,
        RelationshipType::Configures,
        RelationshipType::References,
    ];

    /// Relationship kinds followed by dependency/dependent queries.
    pub const DEPENDENCY_KINDS: [RelationshipType; 3] = [
        RelationshipType::DependsOn,
        RelationshipType::Imports,
        RelationshipType::Uses,
    ];

    /// Whether this kind counts as a dependency edge.
    #[must_use]
    pub fn is_dependency(&self) -> bool {
        Self::DEPENDENCY_KINDS.contains(self)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::Contains => "contains",
            RelationshipType::DependsOn => "dependsOn",
            RelationshipType::Imports => "imports",
            RelationshipType::Uses => "uses",
            RelationshipType::Executes => "executes",
            RelationshipType::Tests => "tests",
            RelationshipType::Documents => "documents",
            RelationshipType::Configures => "configures",
            RelationshipType::References => "references",
        }
    }

    /// Parse a serialized name, ignoring ASCII case.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// RELATIONSHIP
// =============================================================================

/// A typed, directed edge owned by its source node.
///
/// The target is a weak reference: it may name a node that does not exist
/// (yet, or anymore). Traversals skip such edges instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRelationship {
    #[serde(rename = "type")]
    pub kind: RelationshipType,
    pub target_id: NodeId,
}

impl NodeRelationship {
    #[must_use]
    pub fn new(kind: RelationshipType, target_id: impl Into<NodeId>) -> Self {
        Self {
            kind,
            target_id: target_id.into(),
        }
    }

    /// `contains` helper.
    #[must_use]
    pub fn contains(target_id: impl Into<NodeId>) -> Self {
        Self::new(RelationshipType::Contains, target_id)
    }

    /// `dependsOn` helper.
    #[must_use]
    pub fn depends_on(target_id: impl Into<NodeId>) -> Self {
        Self::new(RelationshipType::DependsOn, target_id)
    }
}

// =============================================================================
// REPRESENTATION LAYERS
// =============================================================================

/// Raw content descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRepresentation {
    #[serde(default)]
    pub content: Vec<u8>,
    pub encoding: String,
    pub mime_type: String,
}

impl RawRepresentation {
    /// UTF-8 text content with the given mime type.
    #[must_use]
    pub fn utf8(text: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            content: text.into().into_bytes(),
            encoding: "utf-8".to_string(),
            mime_type: mime_type.into(),
        }
    }

    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.content.len()
    }
}

/// A symbol extracted by a parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSymbol {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub line: u32,
}

/// Structural view of source-like content.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedRepresentation {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub symbols: Vec<ParsedSymbol>,
    #[serde(default)]
    pub imports: Vec<String>,
}

/// Searchable-text projection consumed by full-text search.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedRepresentation {
    pub searchable_text: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Generated summary/explanation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HumanReadableRepresentation {
    pub summary: String,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Fixed-length embedding vector plus the model that produced it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingRepresentation {
    pub vector: Vec<f32>,
    pub model: String,
}

impl EmbeddingRepresentation {
    #[must_use]
    pub fn new(vector: Vec<f32>, model: impl Into<String>) -> Self {
        Self {
            vector,
            model: model.into(),
        }
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

/// The five optional layers of a node. Each is absent until produced.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Representations {
    #[serde(default)]
    pub raw: Option<RawRepresentation>,
    #[serde(default)]
    pub parsed: Option<ParsedRepresentation>,
    #[serde(default)]
    pub indexed: Option<IndexedRepresentation>,
    #[serde(default)]
    pub human_readable: Option<HumanReadableRepresentation>,
    #[serde(default)]
    pub ml_embeddings: Option<EmbeddingRepresentation>,
}

// =============================================================================
// METADATA
// =============================================================================

/// Free-form tags and labels. No index is kept over these.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeMetadata {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

// =============================================================================
// NODE
// =============================================================================

/// A node of the semantic graph.
///
/// Pure value: every change goes through the store (`update`) so that the
/// indexes move with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub path: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub capabilities: BTreeSet<Capability>,
    #[serde(default)]
    pub relationships: Vec<NodeRelationship>,
    #[serde(default)]
    pub representations: Representations,
    #[serde(default)]
    pub metadata: NodeMetadata,
}

impl Node {
    /// Create a node with no capabilities, relationships or layers.
    #[must_use]
    pub fn new(
        id: impl Into<NodeId>,
        path: impl Into<String>,
        name: impl Into<String>,
        node_type: NodeType,
    ) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            name: name.into(),
            node_type,
            capabilities: BTreeSet::new(),
            relationships: Vec::new(),
            representations: Representations::default(),
            metadata: NodeMetadata::default(),
        }
    }

    #[must_use]
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    #[must_use]
    pub fn with_capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities.extend(capabilities);
        self
    }

    #[must_use]
    pub fn with_relationship(mut self, relationship: NodeRelationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.metadata.tags.push(tag.into());
        self
    }

    #[must_use]
    pub fn with_representations(mut self, representations: Representations) -> Self {
        self.representations = representations;
        self
    }

    #[must_use]
    pub fn with_embedding(mut self, vector: Vec<f32>, model: impl Into<String>) -> Self {
        self.representations.ml_embeddings = Some(EmbeddingRepresentation::new(vector, model));
        self
    }

    #[must_use]
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Targets of the forward relationships of the given kind, in list order.
    pub fn targets_of(&self, kind: RelationshipType) -> impl Iterator<Item = &NodeId> + '_ {
        self.relationships
            .iter()
            .filter(move |r| r.kind == kind)
            .map(|r| &r.target_id)
    }

    /// The embedding vector, if one has been produced.
    #[must_use]
    pub fn embedding(&self) -> Option<&[f32]> {
        self.representations
            .ml_embeddings
            .as_ref()
            .map(|e| e.vector.as_slice())
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the semantic graph engine.
///
/// Read-time absence is never an error: lookups return `None` and
/// traversals return empty results. Only mutation contract violations
/// and host-side failures surface here.
#[derive(Debug, Error)]
pub enum SemgraphError {
    /// A live node already uses this id.
    #[error("Duplicate node id: {0}")]
    DuplicateId(NodeId),

    /// A live node already uses this path.
    #[error("Duplicate node path: {0}")]
    DuplicatePath(String),

    /// No live node has this id.
    #[error("Node not found: {0}")]
    NotFound(NodeId),

    /// The node failed ingest validation.
    #[error("Invalid node: {0}")]
    InvalidNode(String),

    /// A writer panicked while holding the session lock.
    #[error("Session lock poisoned")]
    LockPoisoned,

    /// The engine configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An I/O error occurred (host-side loading only).
    #[error("I/O error: {0}")]
    Io(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

// =============================================================================
// TESTS
// =============================================================================
