//! # Embedding Similarity
//!
//! Cosine similarity over `mlEmbeddings` vectors.
//!
//! This is the only module of the engine that performs floating-point
//! arithmetic; the workspace-wide `float_arithmetic` denial is lifted here
//! and nowhere else.

#![allow(clippy::float_arithmetic)]

use crate::Node;
use serde::Serialize;

/// Cosine similarity of two vectors.
///
/// Returns `None` when the lengths differ (the pair is not comparable) and
/// `Some(0.0)` when either vector has zero magnitude. Accumulates in `f64`.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Some(0.0);
    }

    Some((dot / (norm_a.sqrt() * norm_b.sqrt())) as f32)
}

/// A node ranked by similarity to a query node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarNode {
    pub node: Node,
    pub score: f32,
}

/// Rank `candidates` by cosine similarity to `query`, best first.
///
/// Candidates without an embedding, or with a vector of a different length,
/// are skipped. The sort is stable, so equal scores keep candidate order.
pub fn rank_by_similarity<'a>(
    query: &[f32],
    candidates: impl IntoIterator<Item = &'a Node>,
    limit: usize,
) -> Vec<SimilarNode> {
    let mut scored: Vec<(&Node, f32)> = candidates
        .into_iter()
        .filter_map(|node| {
            let vector = node.embedding()?;
            let score = cosine_similarity(query, vector)?;
            Some((node, score))
        })
        .collect();

    scored.sort_by(|(_, a), (_, b)| b.total_cmp(a));
    scored.truncate(limit);

    scored
        .into_iter()
        .map(|(node, score)| SimilarNode {
            node: node.clone(),
            score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeType;

    const EPSILON: f32 = 1e-6;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn embedded(id: &str, vector: Vec<f32>) -> Node {
        Node::new(id, format!("/{id}"), id, NodeType::Document).with_embedding(vector, "test")
    }

    #[test]
    fn identical_vectors_score_one() {
        let score = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]).expect("comparable");
        assert!(close(score, 1.0));

        let score = cosine_similarity(&[0.3, 0.4, 0.5], &[0.3, 0.4, 0.5]).expect("comparable");
        assert!(close(score, 1.0));
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        let score = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).expect("comparable");
        assert!(close(score, 0.0));
    }

    #[test]
    fn opposite_vectors_score_minus_one() {
        let score = cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]).expect("comparable");
        assert!(close(score, -1.0));
    }

    #[test]
    fn zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), Some(0.0));
        assert_eq!(cosine_similarity(&[1.0, 1.0], &[0.0, 0.0]), Some(0.0));
        assert_eq!(cosine_similarity(&[], &[]), Some(0.0));
    }

    #[test]
    fn length_mismatch_is_not_comparable() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), None);
    }

    #[test]
    fn ranking_is_descending_and_truncated() {
        let nodes = vec![
            embedded("far", vec![0.0, 1.0]),
            embedded("near", vec![0.9, 0.1]),
            embedded("mid", vec![0.5, 0.5]),
        ];
        let ranked = rank_by_similarity(&[1.0, 0.0], &nodes, 2);

        let ids: Vec<_> = ranked.iter().map(|s| s.node.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid"]);
        assert!(ranked[0].score >= ranked[1].score);
    }

    #[test]
    fn ranking_ties_keep_candidate_order() {
        let nodes = vec![
            embedded("first", vec![2.0, 0.0]),
            embedded("second", vec![1.0, 0.0]),
        ];
        let ranked = rank_by_similarity(&[1.0, 0.0], &nodes, 10);
        let ids: Vec<_> = ranked.iter().map(|s| s.node.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn ranking_skips_missing_and_mismatched_embeddings() {
        let nodes = vec![
            Node::new("plain", "/plain", "plain", NodeType::Data),
            embedded("wide", vec![1.0, 0.0, 0.0]),
            embedded("ok", vec![1.0, 0.0]),
        ];
        let ranked = rank_by_similarity(&[1.0, 0.0], &nodes, 10);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].node.id.as_str(), "ok");
    }
}
