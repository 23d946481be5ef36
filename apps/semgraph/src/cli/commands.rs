//! # CLI Command Implementations
//!
//! Each command renders its answer to a `String`; `execute` prints it.

use super::QueryArgs;
use semgraph_core::{
    Capability, EngineConfig, Node, NodeId, NodeType, Query, QueryResult, QueryType,
    RepresentationLayer, SemgraphError, Session,
};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE LOADING
// =============================================================================

/// Maximum size of a node dump (256 MB).
///
/// Embeddings make dumps large, but anything beyond this is a mistake.
const MAX_NODES_FILE_SIZE: u64 = 256 * 1024 * 1024;

/// Resolve a path and make sure it names a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, SemgraphError> {
    let canonical = path.canonicalize().map_err(|e| {
        SemgraphError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(SemgraphError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Reject files above `max_size` before reading them.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), SemgraphError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| SemgraphError::Io(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(SemgraphError::Io(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Load the engine configuration, or the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, SemgraphError> {
    match path {
        Some(path) => {
            let config = EngineConfig::from_path(validate_file_path(path)?)?;
            tracing::debug!(?config, "configuration loaded");
            Ok(config)
        }
        None => Ok(EngineConfig::default()),
    }
}

/// Load a JSON array of nodes into a fresh session.
///
/// The batch is all-or-nothing: one invalid or colliding node rejects the
/// whole dump.
pub fn load_session(path: &Path, config: EngineConfig) -> Result<Session, SemgraphError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, MAX_NODES_FILE_SIZE)?;

    let contents = std::fs::read(&validated)
        .map_err(|e| SemgraphError::Io(format!("Read file: {}", e)))?;
    let nodes: Vec<Node> = serde_json::from_slice(&contents)
        .map_err(|e| SemgraphError::Serialization(format!("Parse node dump: {}", e)))?;

    let session = Session::with_config(config);
    let loaded = session.ingest_batch(nodes)?;
    tracing::info!(nodes = loaded.len(), file = %validated.display(), "node dump loaded");

    Ok(session)
}

// =============================================================================
// RENDERING
// =============================================================================

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, SemgraphError> {
    serde_json::to_string_pretty(value).map_err(|e| SemgraphError::Serialization(e.to_string()))
}

fn node_line(node: &Node) -> String {
    format!("{}\t{}\t{}", node.id, node.node_type, node.path)
}

fn cycle_line(cycle: &[NodeId]) -> String {
    let mut line = cycle
        .iter()
        .map(NodeId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ");
    if let Some(first) = cycle.first() {
        let _ = write!(line, " -> {}", first);
    }
    line
}

/// Render a query result as text lines or pretty JSON.
pub fn render(result: &QueryResult, json_mode: bool) -> Result<String, SemgraphError> {
    if json_mode {
        return to_json(result);
    }

    let lines: Vec<String> = match result {
        QueryResult::Node(Some(node)) => vec![node_line(node)],
        QueryResult::Node(None) => vec!["(none)".to_string()],
        QueryResult::Nodes(nodes) if nodes.is_empty() => vec!["(no nodes)".to_string()],
        QueryResult::Nodes(nodes) => nodes.iter().map(node_line).collect(),
        QueryResult::Similar(similar) if similar.is_empty() => {
            vec!["(no comparable embeddings)".to_string()]
        }
        QueryResult::Similar(similar) => similar
            .iter()
            .map(|s| format!("{:.4}\t{}", s.score, node_line(&s.node)))
            .collect(),
        QueryResult::Cycles(cycles) if cycles.is_empty() => vec!["no dependsOn cycles".to_string()],
        QueryResult::Cycles(cycles) => cycles.iter().map(|c| cycle_line(c)).collect(),
    };
    Ok(lines.join("\n"))
}

// =============================================================================
// STATS COMMAND
// =============================================================================

/// Show graph statistics.
pub fn cmd_stats(session: &Session, json_mode: bool) -> Result<String, SemgraphError> {
    let stats = session.stats()?;

    if json_mode {
        return to_json(&stats);
    }

    let mut out = String::new();
    let _ = writeln!(out, "Semantic Graph Stats");
    let _ = writeln!(out, "====================");
    let _ = writeln!(out, "Nodes:         {}", stats.node_count);
    let _ = writeln!(out, "Relationships: {}", stats.relationship_count);
    if !stats.type_distribution.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Types:");
        for (node_type, count) in &stats.type_distribution {
            let _ = writeln!(out, "  {:<12} {}", node_type.as_str(), count);
        }
    }
    Ok(out.trim_end().to_string())
}

// =============================================================================
// SHOW COMMAND
// =============================================================================

/// Print one node.
pub fn cmd_show(session: &Session, id: &str, json_mode: bool) -> Result<String, SemgraphError> {
    let id = NodeId::new(id);
    let node = session
        .get(&id)?
        .ok_or_else(|| SemgraphError::NotFound(id.clone()))?;

    if json_mode {
        return to_json(&node);
    }

    let capabilities: Vec<&str> = node.capabilities.iter().map(|c| c.as_str()).collect();
    let layers: Vec<&str> = RepresentationLayer::ALL
        .into_iter()
        .filter(|layer| node.representations.is_present(*layer))
        .map(|layer| layer.as_str())
        .collect();

    let mut out = String::new();
    let _ = writeln!(out, "Id:            {}", node.id);
    let _ = writeln!(out, "Path:          {}", node.path);
    let _ = writeln!(out, "Name:          {}", node.name);
    let _ = writeln!(out, "Type:          {}", node.node_type);
    let _ = writeln!(out, "Capabilities:  {}", capabilities.join(", "));
    let _ = writeln!(out, "Layers:        {}", layers.join(", "));
    for rel in &node.relationships {
        let _ = writeln!(out, "  {} -> {}", rel.kind, rel.target_id);
    }
    Ok(out.trim_end().to_string())
}

// =============================================================================
// QUERY COMMAND
// =============================================================================

fn required<'a>(value: Option<&'a str>, flag: &str, kind: &str) -> Result<&'a str, SemgraphError> {
    value.ok_or_else(|| SemgraphError::Config(format!("query type '{}' requires --{}", kind, flag)))
}

/// Translate command-line arguments into a structured query.
pub fn build_query(args: &QueryArgs) -> Result<Query, SemgraphError> {
    let kind = args.query_type.to_ascii_lowercase();
    let id = || required(args.id.as_deref(), "id", &kind).map(NodeId::new);

    let query_type = match kind.as_str() {
        "lookup" => QueryType::Lookup(id()?),
        "path" => QueryType::LookupPath(required(args.path.as_deref(), "path", &kind)?.to_string()),
        "type" => {
            let raw = required(args.node_type.as_deref(), "node-type", &kind)?;
            let node_type = NodeType::parse(raw)
                .ok_or_else(|| SemgraphError::Config(format!("unknown node type '{}'", raw)))?;
            QueryType::ByType(node_type)
        }
        "capability" => {
            let raw = required(args.capability.as_deref(), "capability", &kind)?;
            let capability = Capability::parse(raw)
                .ok_or_else(|| SemgraphError::Config(format!("unknown capability '{}'", raw)))?;
            QueryType::ByCapability(capability)
        }
        "children" => QueryType::Children(id()?),
        "parent" => QueryType::Parent(id()?),
        "dependencies" => QueryType::Dependencies(id()?),
        "dependents" => QueryType::Dependents(id()?),
        "search" => QueryType::Search(required(args.text.as_deref(), "text", &kind)?.to_string()),
        "similar" => QueryType::FindSimilar(id()?),
        "path-to-root" => QueryType::PathToRoot(id()?),
        "subtree" => QueryType::Subtree(id()?),
        "cycles" => QueryType::DetectCycles,
        other => {
            return Err(SemgraphError::Config(format!("unknown query type '{}'", other)));
        }
    };

    Ok(Query {
        query_type,
        limit: args.limit,
    })
}

/// Execute a structured query.
pub fn cmd_query(session: &Session, args: &QueryArgs, json_mode: bool) -> Result<String, SemgraphError> {
    let query = build_query(args)?;
    tracing::debug!(?query, "executing query");
    let result = session.execute(&query)?;
    render(&result, json_mode)
}

// =============================================================================
// SIMILAR / CYCLES / VALIDATE
// =============================================================================

/// Rank nodes by similarity to `id`.
pub fn cmd_similar(
    session: &Session,
    id: &str,
    limit: Option<usize>,
    json_mode: bool,
) -> Result<String, SemgraphError> {
    let id = NodeId::new(id);
    if session.get(&id)?.is_none() {
        return Err(SemgraphError::NotFound(id));
    }
    let limit = limit.unwrap_or(session.config().default_similarity_limit);
    let result = session.execute(&Query::similar(id, limit))?;
    render(&result, json_mode)
}

/// Report dependsOn cycles.
pub fn cmd_cycles(session: &Session, json_mode: bool) -> Result<String, SemgraphError> {
    let result = session.execute(&Query::new(QueryType::DetectCycles))?;
    render(&result, json_mode)
}

/// Report dangling relationship targets.
pub fn cmd_validate(session: &Session, json_mode: bool) -> Result<String, SemgraphError> {
    let dangling = session.validate_references()?;

    if json_mode {
        return to_json(&dangling);
    }

    if dangling.is_empty() {
        return Ok("all relationship targets are live".to_string());
    }

    let mut out = format!("{} dangling relationship(s)", dangling.len());
    for reference in &dangling {
        let _ = write!(
            out,
            "\n{}\t{}\t{}",
            reference.source, reference.relationship.kind, reference.relationship.target_id
        );
    }
    Ok(out)
}
