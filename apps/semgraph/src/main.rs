//! # semgraph - Semantic Graph Inspector
//!
//! Loads a node dump into an in-memory engine and answers one request.
//!
//! ## Usage
//!
//! ```bash
//! # Statistics
//! semgraph -n nodes.json stats
//!
//! # Structured queries
//! semgraph -n nodes.json query -t children --id p1
//! semgraph -n nodes.json query -t search --text socket --limit 5
//!
//! # Similarity, cycles, validation
//! semgraph -n nodes.json similar --id f1
//! semgraph -n nodes.json cycles
//! semgraph -n nodes.json validate
//! ```

use clap::Parser;
use semgraph::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // SEMGRAPH_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("SEMGRAPH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_env("SEMGRAPH_LOG")
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| "semgraph=info".into());

    // Logs go to stderr so command output stays pipeable.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if let Err(e) = cli::execute(&cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
