//! # Ingestor Module
//!
//! Node validation and ingestion protocol for the graph engine.
//!
//! - Validate nodes before graph mutation
//! - Reject malformed producer output (empty ids, oversized paths,
//!   non-finite embeddings)
//! - Ingest scanner batches all-or-nothing
//! - Detect type and default capabilities from a file path, for producers
//!   that have nothing better

use crate::graph::GraphStore;
use crate::primitives::{
    MAX_BATCH_SIZE, MAX_EMBEDDING_DIMENSION, MAX_ID_LENGTH, MAX_NAME_LENGTH, MAX_PATH_LENGTH,
    MAX_RELATIONSHIPS_PER_NODE,
};
use crate::{Capability, Node, NodeId, NodeType, SemgraphError};
use std::collections::BTreeSet;

/// The Ingestor handles node validation and graph ingestion.
pub struct Ingestor;

impl Ingestor {
    /// Validate a node.
    ///
    /// A node is valid if:
    /// - id and path are non-empty and within length limits
    /// - name is within length limits
    /// - it carries at most `MAX_RELATIONSHIPS_PER_NODE` relationships
    /// - its embedding, if any, is within `MAX_EMBEDDING_DIMENSION` and finite
    pub fn validate(node: &Node) -> Result<(), SemgraphError> {
        let id = node.id.as_str();
        if id.is_empty() {
            return Err(SemgraphError::InvalidNode("empty id".to_string()));
        }
        if id.len() > MAX_ID_LENGTH {
            return Err(SemgraphError::InvalidNode(format!(
                "id longer than {MAX_ID_LENGTH} bytes"
            )));
        }

        if node.path.is_empty() {
            return Err(SemgraphError::InvalidNode(format!("{id}: empty path")));
        }
        if node.path.len() > MAX_PATH_LENGTH {
            return Err(SemgraphError::InvalidNode(format!(
                "{id}: path longer than {MAX_PATH_LENGTH} bytes"
            )));
        }

        if node.name.len() > MAX_NAME_LENGTH {
            return Err(SemgraphError::InvalidNode(format!(
                "{id}: name longer than {MAX_NAME_LENGTH} bytes"
            )));
        }

        if node.relationships.len() > MAX_RELATIONSHIPS_PER_NODE {
            return Err(SemgraphError::InvalidNode(format!(
                "{id}: more than {MAX_RELATIONSHIPS_PER_NODE} relationships"
            )));
        }

        if let Some(embedding) = &node.representations.ml_embeddings {
            if embedding.dimension() > MAX_EMBEDDING_DIMENSION {
                return Err(SemgraphError::InvalidNode(format!(
                    "{id}: embedding dimension {} exceeds {MAX_EMBEDDING_DIMENSION}",
                    embedding.dimension()
                )));
            }
            if embedding.vector.iter().any(|v| !v.is_finite()) {
                return Err(SemgraphError::InvalidNode(format!(
                    "{id}: embedding contains non-finite values"
                )));
            }
        }

        Ok(())
    }

    /// Validate and add a single node.
    pub fn ingest<G: GraphStore>(graph: &mut G, node: Node) -> Result<NodeId, SemgraphError> {
        Self::validate(&node)?;
        let id = node.id.clone();
        graph.add(node)?;
        Ok(id)
    }

    /// Ingest a batch of nodes from a producer.
    ///
    /// The whole batch is checked first: validation, id/path collisions
    /// with live nodes, and id/path collisions inside the batch. Nothing is
    /// inserted unless every node passes.
    pub fn ingest_batch<G: GraphStore>(
        graph: &mut G,
        nodes: Vec<Node>,
    ) -> Result<Vec<NodeId>, SemgraphError> {
        if nodes.len() > MAX_BATCH_SIZE {
            return Err(SemgraphError::InvalidNode(format!(
                "batch of {} nodes exceeds {MAX_BATCH_SIZE}",
                nodes.len()
            )));
        }

        let mut ids = BTreeSet::new();
        let mut paths = BTreeSet::new();
        for node in &nodes {
            Self::validate(node)?;
            if graph.contains(&node.id) || !ids.insert(&node.id) {
                return Err(SemgraphError::DuplicateId(node.id.clone()));
            }
            if graph.get_by_path(&node.path).is_some() || !paths.insert(node.path.as_str()) {
                return Err(SemgraphError::DuplicatePath(node.path.clone()));
            }
        }

        let mut added = Vec::with_capacity(nodes.len());
        for node in nodes {
            added.push(node.id.clone());
            graph.add(node)?;
        }
        tracing::debug!(count = added.len(), "batch ingested");
        Ok(added)
    }

    /// Check if a node with the same id or path is already live.
    pub fn is_duplicate<G: GraphStore>(graph: &G, node: &Node) -> bool {
        graph.contains(&node.id) || graph.get_by_path(&node.path).is_some()
    }

    // =========================================================================
    // PRODUCER HELPERS
    // =========================================================================

    /// Guess a node type from a file path.
    ///
    /// Directory entries are the scanner's call; this only looks at the
    /// file name and extension.
    #[must_use]
    pub fn detect_type(path: &str) -> NodeType {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        let lower = file_name.to_ascii_lowercase();

        if lower.ends_with(".xcodeproj") || lower == "package.swift" || lower == "cargo.toml" {
            return NodeType::Project;
        }
        if path.contains("/.github/workflows/") {
            return NodeType::Workflow;
        }

        let extension = lower.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        match extension {
            "swift" | "rs" | "py" | "js" | "ts" | "go" | "java" | "kt" | "c" | "h" | "cpp"
            | "m" | "rb" => {
                if lower.contains("test") {
                    NodeType::Test
                } else {
                    NodeType::SourceFile
                }
            }
            "sh" | "bash" | "zsh" | "fish" => NodeType::Script,
            "command" => NodeType::Command,
            "agent" => NodeType::Agent,
            "md" | "txt" | "rst" | "pdf" => NodeType::Document,
            "json" | "yaml" | "yml" | "toml" | "plist" | "ini" | "env" => NodeType::Config,
            "png" | "jpg" | "jpeg" | "gif" | "svg" | "ico" | "mp3" | "wav" => NodeType::Asset,
            "storyboard" | "xib" | "html" | "css" => NodeType::View,
            "mlmodel" | "onnx" | "gguf" | "safetensors" => NodeType::Model,
            "service" => NodeType::Service,
            "csv" | "tsv" | "sqlite" | "db" | "parquet" => NodeType::Data,
            _ => NodeType::Unknown,
        }
    }

    /// Capabilities a node of this type gets by default.
    #[must_use]
    pub fn default_capabilities(node_type: NodeType) -> BTreeSet<Capability> {
        use Capability::*;

        let extra: &[Capability] = match node_type {
            NodeType::SourceFile => &[
                Editable,
                Previewable,
                Indexable,
                Searchable,
                Explainable,
                Refactorable,
                Embeddable,
                Testable,
                Versionable,
            ],
            NodeType::Test => &[
                Editable,
                Executable,
                Indexable,
                Searchable,
                Explainable,
                Testable,
                Versionable,
            ],
            NodeType::Script | NodeType::Command => &[
                Editable,
                Executable,
                Indexable,
                Searchable,
                Explainable,
                Versionable,
            ],
            NodeType::Workflow => &[Editable, Executable, Explainable, Syncable, Versionable],
            NodeType::Agent | NodeType::Service => &[Executable, Explainable, Syncable],
            NodeType::Document => &[
                Editable,
                Previewable,
                Indexable,
                Searchable,
                Explainable,
                Embeddable,
                Exportable,
                Versionable,
            ],
            NodeType::Config => &[Editable, Indexable, Searchable, Explainable, Versionable],
            NodeType::View => &[Editable, Previewable, Explainable, Versionable],
            NodeType::Asset => &[Previewable, Exportable],
            NodeType::Model => &[Explainable, Exportable],
            NodeType::Data => &[Previewable, Indexable, Searchable, Exportable],
            NodeType::Project | NodeType::Directory => &[Searchable, Syncable, Versionable],
            NodeType::Unknown => &[],
        };

        std::iter::once(Viewable).chain(extra.iter().copied()).collect()
    }

    /// Build a node for a scanned file: name from the last path segment,
    /// type and capabilities detected.
    #[must_use]
    pub fn node_for_path(id: impl Into<NodeId>, path: impl Into<String>) -> Node {
        let path = path.into();
        let name = path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        let node_type = Self::detect_type(&path);
        Node::new(id, path, name, node_type).with_capabilities(Self::default_capabilities(node_type))
    }
}

// =============================================================================
// TESTS
// =============================================================================
