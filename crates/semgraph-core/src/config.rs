//! # Engine Configuration
//!
//! Runtime tuning for the engine, loaded from TOML.
//!
//! ```toml
//! max_traversal_depth = 2000
//! default_similarity_limit = 5
//! enqueue_regeneration = false
//! ```
//!
//! Every field is optional; missing fields take the compiled-in defaults
//! from [`crate::primitives`]. The cascade policy is not configurable.

use crate::SemgraphError;
use crate::primitives::{DEFAULT_MAX_TRAVERSAL_DEPTH, DEFAULT_SIMILARITY_LIMIT};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Hard cap on `subtree` depth and `path_to_root` length.
    pub max_traversal_depth: usize,
    /// Result count for similarity requests that carry no limit.
    pub default_similarity_limit: usize,
    /// Forward cascade invalidations to the session's regeneration sink.
    pub enqueue_regeneration: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_traversal_depth: DEFAULT_MAX_TRAVERSAL_DEPTH,
            default_similarity_limit: DEFAULT_SIMILARITY_LIMIT,
            enqueue_regeneration: true,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, SemgraphError> {
        let config: Self = toml::from_str(text).map_err(|e| SemgraphError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SemgraphError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SemgraphError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), SemgraphError> {
        if self.max_traversal_depth == 0 {
            return Err(SemgraphError::Config(
                "max_traversal_depth must be at least 1".to_string(),
            ));
        }
        if self.default_similarity_limit == 0 {
            return Err(SemgraphError::Config(
                "default_similarity_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
