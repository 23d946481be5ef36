//! # Semgraph CLI Module
//!
//! This module implements the CLI interface for semgraph.
//!
//! ## Available Commands
//!
//! - `stats` - Show graph statistics (default)
//! - `show` - Print one node
//! - `query` - Execute a structured query
//! - `similar` - Rank nodes by embedding similarity
//! - `cycles` - Report `dependsOn` cycles
//! - `validate` - Report dangling relationship targets

mod commands;

use clap::{Args, Parser, Subcommand};
use semgraph_core::SemgraphError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// semgraph - Semantic Graph Inspector
///
/// Loads a scanner's node dump into the in-memory engine and answers
/// structural, textual and similarity queries over it.
#[derive(Parser, Debug)]
#[command(name = "semgraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the JSON node dump (an array of nodes)
    #[arg(short = 'n', long, global = true, default_value = "nodes.json")]
    pub nodes: PathBuf,

    /// Engine configuration file (TOML)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show graph statistics
    Stats,

    /// Print one node
    Show {
        /// Node id
        #[arg(long)]
        id: String,
    },

    /// Execute a structured query
    Query(QueryArgs),

    /// Rank nodes by embedding similarity to a node
    Similar {
        /// Node id
        #[arg(long)]
        id: String,

        /// Maximum number of results (defaults to the configured limit)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Report dependsOn cycles
    Cycles,

    /// Report relationships whose target is not a live node
    Validate,
}

/// Arguments of the `query` command.
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// Query type (lookup, path, type, capability, children, parent,
    /// dependencies, dependents, search, similar, path-to-root, subtree, cycles)
    #[arg(short = 't', long)]
    pub query_type: String,

    /// Node id
    #[arg(long)]
    pub id: Option<String>,

    /// Node path (for path lookups)
    #[arg(long)]
    pub path: Option<String>,

    /// Search text
    #[arg(long)]
    pub text: Option<String>,

    /// Node type (for type queries)
    #[arg(long)]
    pub node_type: Option<String>,

    /// Capability (for capability queries)
    #[arg(long)]
    pub capability: Option<String>,

    /// Maximum number of results
    #[arg(short, long)]
    pub limit: Option<usize>,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Run the parsed command and return what it would print.
pub fn run(cli: &Cli) -> Result<String, SemgraphError> {
    let config = load_config(cli.config.as_deref())?;
    let session = load_session(&cli.nodes, config)?;
    let json_mode = cli.json_mode;

    match &cli.command {
        Some(Commands::Stats) | None => cmd_stats(&session, json_mode),
        Some(Commands::Show { id }) => cmd_show(&session, id, json_mode),
        Some(Commands::Query(args)) => cmd_query(&session, args, json_mode),
        Some(Commands::Similar { id, limit }) => cmd_similar(&session, id, *limit, json_mode),
        Some(Commands::Cycles) => cmd_cycles(&session, json_mode),
        Some(Commands::Validate) => cmd_validate(&session, json_mode),
    }
}

/// Execute the CLI with parsed arguments.
pub fn execute(cli: &Cli) -> Result<(), SemgraphError> {
    let output = run(cli)?;
    println!("{}", output);
    Ok(())
}
