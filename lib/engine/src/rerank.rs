//! Health-weighted re-ranking of ANN candidates
//!
//! Each surviving candidate gets a fused score
//! `(1 - gamma) * preference + gamma * health`, where preference is the
//! cosine similarity to the query and health the product's quality score.

use crate::context::RecommendationContext;
use crate::query::Query;
use ahash::AHashSet;
use nutrirank_core::{ExternalId, InternalIndex};
use ordered_float::OrderedFloat;
use serde::Serialize;
use std::cmp::Reverse;
use tracing::warn;

/// A product with its fused score and the two components behind it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub product_id: ExternalId,
    pub score: f32,
    pub preference: f32,
    pub health: f32,
}

#[inline]
pub fn fuse(preference: f32, health: f32, gamma: f32) -> f32 {
    (1.0 - gamma) * preference + gamma * health
}

pub struct Reranker<'a> {
    context: &'a RecommendationContext,
    max_results: usize,
}

impl<'a> Reranker<'a> {
    pub fn new(context: &'a RecommendationContext, max_results: usize) -> Self {
        Self {
            context,
            max_results,
        }
    }

    /// Score, filter and order `candidates` (given in ANN order).
    ///
    /// Candidates outside the item table, already in the basket, or without
    /// an external id are skipped. A candidate repeated by the index counts
    /// once. Equal scores keep their ANN order.
    pub fn rerank(
        &self,
        query: &Query,
        candidates: &[InternalIndex],
        gamma: f32,
    ) -> Vec<RankedCandidate> {
        let embeddings = self.context.embeddings();
        let products = self.context.products();
        let quality = self.context.quality();

        let mut seen = AHashSet::with_capacity(candidates.len());
        let mut ranked = Vec::with_capacity(candidates.len());

        for &index in candidates {
            if query.basket.contains(index) || !seen.insert(index) {
                continue;
            }
            let Some(item) = embeddings.item_vector(index) else {
                continue;
            };
            let Some(product_id) = products.to_external_id(index) else {
                warn!(index, "candidate row has no product id, skipping");
                continue;
            };

            let preference = query.vector.dot(item);
            let health = quality.score(product_id);
            ranked.push(RankedCandidate {
                product_id,
                score: fuse(preference, health, gamma),
                preference,
                health,
            });
        }

        ranked.sort_by_key(|c| Reverse(OrderedFloat(c.score)));
        ranked.truncate(self.max_results);
        ranked
    }
}
