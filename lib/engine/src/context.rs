use nutrirank_core::{
    AnnIndex, EmbeddingStore, Error, IdentifierMapping, QualityScoreTable, Result,
};
use std::sync::Arc;

/// Everything loaded at startup, validated once and never mutated.
///
/// Shared between request handlers behind an `Arc`; nothing in here needs a
/// lock because nothing is ever written after construction.
pub struct RecommendationContext {
    products: IdentifierMapping,
    users: IdentifierMapping,
    embeddings: EmbeddingStore,
    quality: QualityScoreTable,
    index: Arc<dyn AnnIndex>,
}

impl RecommendationContext {
    pub fn new(
        products: IdentifierMapping,
        users: IdentifierMapping,
        embeddings: EmbeddingStore,
        quality: QualityScoreTable,
        index: Arc<dyn AnnIndex>,
    ) -> Result<Self> {
        if embeddings.num_items() != products.len() {
            return Err(Error::ArtifactDimensionMismatch {
                artifact: "item embedding rows vs product mapping".to_string(),
                expected: products.len(),
                actual: embeddings.num_items(),
            });
        }
        if users.len() != embeddings.num_users() {
            return Err(Error::ArtifactDimensionMismatch {
                artifact: "user embedding rows vs user mapping".to_string(),
                expected: users.len(),
                actual: embeddings.num_users(),
            });
        }
        if index.dim() != embeddings.dim() {
            return Err(Error::ArtifactDimensionMismatch {
                artifact: "ann index dimension".to_string(),
                expected: embeddings.dim(),
                actual: index.dim(),
            });
        }
        if index.len() != embeddings.num_items() {
            return Err(Error::ArtifactDimensionMismatch {
                artifact: "ann index rows".to_string(),
                expected: embeddings.num_items(),
                actual: index.len(),
            });
        }

        Ok(Self {
            products,
            users,
            embeddings,
            quality,
            index,
        })
    }

    pub fn products(&self) -> &IdentifierMapping {
        &self.products
    }

    pub fn users(&self) -> &IdentifierMapping {
        &self.users
    }

    pub fn embeddings(&self) -> &EmbeddingStore {
        &self.embeddings
    }

    pub fn quality(&self) -> &QualityScoreTable {
        &self.quality
    }

    pub fn index(&self) -> &dyn AnnIndex {
        self.index.as_ref()
    }
}

impl std::fmt::Debug for RecommendationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecommendationContext")
            .field("products", &self.products.len())
            .field("users", &self.users.len())
            .field("embedding_dim", &self.embeddings.dim())
            .field("quality_scores", &self.quality.len())
            .field("index_rows", &self.index.len())
            .finish()
    }
}
