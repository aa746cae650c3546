use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MANIFEST_FILE: &str = "manifest.json";

/// Describes one model directory: sizes fixed at training time, the files
/// that make up the bundle and their optional sha256 digests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub embedding_dim: usize,
    pub num_users: usize,
    pub num_products: usize,
    /// Whether item rows were normalized by the build step. When false the
    /// loader normalizes them; when true it only verifies.
    #[serde(default)]
    pub item_vectors_normalized: bool,
    #[serde(default)]
    pub files: ArtifactFiles,
    /// File name -> lowercase hex sha256.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub checksums: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactFiles {
    pub item_embeddings: String,
    pub user_embeddings: String,
    pub product_mapping: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_mapping: Option<String>,
    pub quality_scores: String,
}

impl Default for ArtifactFiles {
    fn default() -> Self {
        Self {
            item_embeddings: "item_embeddings.bin.gz".to_string(),
            user_embeddings: "user_embeddings.bin.gz".to_string(),
            product_mapping: "product_to_idx.json".to_string(),
            user_mapping: None,
            quality_scores: "quality_scores.json".to_string(),
        }
    }
}

/// One row of the quality score table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QualityRecord {
    pub product_id: i64,
    pub health_factor: f32,
}
