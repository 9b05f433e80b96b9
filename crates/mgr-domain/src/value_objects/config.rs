//! Configuration value objects shared across layers.

use serde::{Deserialize, Serialize};

use crate::constants::search::{DEFAULT_BM25_WEIGHT, DEFAULT_KNN_WEIGHT};

/// Per-namespace hybrid score fusion weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HybridSearchSettings {
    /// Weight of the normalized BM25 sub-score
    pub bm25_weight: f32,
    /// Weight of the normalized k-NN sub-score
    pub knn_weight: f32,
}

impl Default for HybridSearchSettings {
    fn default() -> Self {
        Self {
            bm25_weight: DEFAULT_BM25_WEIGHT,
            knn_weight: DEFAULT_KNN_WEIGHT,
        }
    }
}
