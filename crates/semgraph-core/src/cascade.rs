//! # Representation Cascade
//!
//! The fixed invalidation policy between the five representation layers.
//!
//! | Changed layer   | Cleared layers                                   |
//! |-----------------|--------------------------------------------------|
//! | `raw`           | `parsed`, `indexed`, `humanReadable`, `mlEmbeddings` |
//! | `parsed`        | `indexed`, `humanReadable`                       |
//! | `indexed`       | none                                             |
//! | `humanReadable` | none                                             |
//! | `mlEmbeddings`  | none                                             |
//!
//! Embeddings derive from raw content, not from structure, so a `parsed`
//! change leaves them in place. Dependent layers are cleared, never
//! recomputed here; regeneration belongs to external producers.

use crate::types::{
    EmbeddingRepresentation, HumanReadableRepresentation, IndexedRepresentation,
    ParsedRepresentation, RawRepresentation, Representations,
};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// LAYERS
// =============================================================================

/// One of the five representation layers of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RepresentationLayer {
    Raw,
    Parsed,
    Indexed,
    HumanReadable,
    MlEmbeddings,
}

impl RepresentationLayer {
    pub const ALL: [RepresentationLayer; 5] = [
        RepresentationLayer::Raw,
        RepresentationLayer::Parsed,
        RepresentationLayer::Indexed,
        RepresentationLayer::HumanReadable,
        RepresentationLayer::MlEmbeddings,
    ];

    /// Layers that become stale when this layer changes.
    #[must_use]
    pub fn invalidates(self) -> &'static [RepresentationLayer] {
        match self {
            RepresentationLayer::Raw => &[
                RepresentationLayer::Parsed,
                RepresentationLayer::Indexed,
                RepresentationLayer::HumanReadable,
                RepresentationLayer::MlEmbeddings,
            ],
            RepresentationLayer::Parsed => &[
                RepresentationLayer::Indexed,
                RepresentationLayer::HumanReadable,
            ],
            RepresentationLayer::Indexed
            | RepresentationLayer::HumanReadable
            | RepresentationLayer::MlEmbeddings => &[],
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RepresentationLayer::Raw => "raw",
            RepresentationLayer::Parsed => "parsed",
            RepresentationLayer::Indexed => "indexed",
            RepresentationLayer::HumanReadable => "humanReadable",
            RepresentationLayer::MlEmbeddings => "mlEmbeddings",
        }
    }
}

impl fmt::Display for RepresentationLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// LAYER CHANGE
// =============================================================================

/// A new value for exactly one layer. `None` clears the layer.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerChange {
    Raw(Option<RawRepresentation>),
    Parsed(Option<ParsedRepresentation>),
    Indexed(Option<IndexedRepresentation>),
    HumanReadable(Option<HumanReadableRepresentation>),
    MlEmbeddings(Option<EmbeddingRepresentation>),
}

impl LayerChange {
    /// The layer this change targets.
    #[must_use]
    pub fn layer(&self) -> RepresentationLayer {
        match self {
            LayerChange::Raw(_) => RepresentationLayer::Raw,
            LayerChange::Parsed(_) => RepresentationLayer::Parsed,
            LayerChange::Indexed(_) => RepresentationLayer::Indexed,
            LayerChange::HumanReadable(_) => RepresentationLayer::HumanReadable,
            LayerChange::MlEmbeddings(_) => RepresentationLayer::MlEmbeddings,
        }
    }
}

// =============================================================================
// POLICY APPLICATION
// =============================================================================

impl Representations {
    /// Whether the given layer currently holds a value.
    #[must_use]
    pub fn is_present(&self, layer: RepresentationLayer) -> bool {
        match layer {
            RepresentationLayer::Raw => self.raw.is_some(),
            RepresentationLayer::Parsed => self.parsed.is_some(),
            RepresentationLayer::Indexed => self.indexed.is_some(),
            RepresentationLayer::HumanReadable => self.human_readable.is_some(),
            RepresentationLayer::MlEmbeddings => self.ml_embeddings.is_some(),
        }
    }

    /// Set a layer to absent.
    pub fn clear(&mut self, layer: RepresentationLayer) {
        match layer {
            RepresentationLayer::Raw => self.raw = None,
            RepresentationLayer::Parsed => self.parsed = None,
            RepresentationLayer::Indexed => self.indexed = None,
            RepresentationLayer::HumanReadable => self.human_readable = None,
            RepresentationLayer::MlEmbeddings => self.ml_embeddings = None,
        }
    }

    /// Write the changed layer, then clear every layer it invalidates.
    ///
    /// Dependents are cleared regardless of their prior contents. Returns
    /// the invalidated layers.
    pub fn apply_change(&mut self, change: LayerChange) -> &'static [RepresentationLayer] {
        let layer = change.layer();
        match change {
            LayerChange::Raw(v) => self.raw = v,
            LayerChange::Parsed(v) => self.parsed = v,
            LayerChange::Indexed(v) => self.indexed = v,
            LayerChange::HumanReadable(v) => self.human_readable = v,
            LayerChange::MlEmbeddings(v) => self.ml_embeddings = v,
        }

        let invalidated = layer.invalidates();
        for dependent in invalidated {
            self.clear(*dependent);
        }
        invalidated
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> Representations {
        Representations {
            raw: Some(RawRepresentation::utf8("let a = 1", "text/x-swift")),
            parsed: Some(ParsedRepresentation::default()),
            indexed: Some(IndexedRepresentation {
                searchable_text: "let a".to_string(),
                keywords: Vec::new(),
            }),
            human_readable: Some(HumanReadableRepresentation {
                summary: "declares a".to_string(),
                explanation: None,
            }),
            ml_embeddings: Some(EmbeddingRepresentation::new(vec![0.5, 0.5], "mini")),
        }
    }

    #[test]
    fn raw_change_clears_all_derived_layers() {
        let mut reps = full();
        let cleared = reps.apply_change(LayerChange::Raw(Some(RawRepresentation::utf8(
            "let b = 2",
            "text/x-swift",
        ))));

        assert_eq!(cleared.len(), 4);
        assert!(reps.raw.is_some());
        assert!(reps.parsed.is_none());
        assert!(reps.indexed.is_none());
        assert!(reps.human_readable.is_none());
        assert!(reps.ml_embeddings.is_none());
    }

    #[test]
    fn parsed_change_keeps_embeddings() {
        let mut reps = full();
        reps.apply_change(LayerChange::Parsed(Some(ParsedRepresentation {
            language: Some("swift".to_string()),
            ..ParsedRepresentation::default()
        })));

        assert!(reps.raw.is_some());
        assert_eq!(
            reps.parsed.as_ref().and_then(|p| p.language.as_deref()),
            Some("swift")
        );
        assert!(reps.indexed.is_none());
        assert!(reps.human_readable.is_none());
        assert!(reps.ml_embeddings.is_some());
    }

    #[test]
    fn leaf_layers_invalidate_nothing() {
        for layer in [
            RepresentationLayer::Indexed,
            RepresentationLayer::HumanReadable,
            RepresentationLayer::MlEmbeddings,
        ] {
            assert!(layer.invalidates().is_empty());
        }

        let mut reps = full();
        reps.apply_change(LayerChange::MlEmbeddings(None));
        assert!(reps.ml_embeddings.is_none());
        assert!(reps.indexed.is_some());
        assert!(reps.parsed.is_some());
    }

    #[test]
    fn no_layer_invalidates_itself_or_raw() {
        for layer in RepresentationLayer::ALL {
            assert!(!layer.invalidates().contains(&layer));
            assert!(!layer.invalidates().contains(&RepresentationLayer::Raw));
        }
    }

    #[test]
    fn raw_change_on_empty_bundle_is_harmless() {
        let mut reps = Representations::default();
        reps.apply_change(LayerChange::Raw(None));
        for layer in RepresentationLayer::ALL {
            assert!(!reps.is_present(layer));
        }
    }
}
