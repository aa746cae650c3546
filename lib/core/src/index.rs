use crate::mapping::InternalIndex;
use crate::{EmbeddingStore, Error, Result, Vector};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use std::cmp::Reverse;

/// Top-k nearest-neighbour search over unit-length item vectors.
///
/// Results are ordered by descending inner product with `query` and hold at
/// most `k` row indices. Implementations may be approximate.
pub trait AnnIndex: Send + Sync {
    fn search(&self, query: &Vector, k: usize) -> Result<Vec<InternalIndex>>;

    fn len(&self) -> usize;

    fn dim(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exact inner-product index: scores every row and keeps the best `k`.
///
/// Rows live in one contiguous buffer; scoring is spread over the rayon pool.
/// Equal scores are ordered by ascending row index, so results are
/// deterministic.
pub struct FlatIndex {
    vectors: Vec<f32>,
    dim: usize,
}

impl FlatIndex {
    pub fn new(dim: usize) -> Self {
        Self {
            vectors: Vec::new(),
            dim,
        }
    }

    /// Copy the (already normalized) item table into a flat index.
    pub fn from_store(store: &EmbeddingStore) -> Self {
        let mut index = Self::new(store.dim());
        index.vectors.reserve(store.num_items() * store.dim());
        for item in store.items() {
            index.vectors.extend_from_slice(item.as_slice());
        }
        index
    }

    pub fn push(&mut self, vector: &Vector) -> Result<InternalIndex> {
        if vector.dim() != self.dim {
            return Err(Error::ArtifactDimensionMismatch {
                artifact: "flat index row".to_string(),
                expected: self.dim,
                actual: vector.dim(),
            });
        }
        self.vectors.extend_from_slice(vector.as_slice());
        Ok(self.len() - 1)
    }
}

impl AnnIndex for FlatIndex {
    fn search(&self, query: &Vector, k: usize) -> Result<Vec<InternalIndex>> {
        if query.dim() != self.dim {
            return Err(Error::RetrievalFailure(format!(
                "query dimension {} does not match index dimension {}",
                query.dim(),
                self.dim
            )));
        }
        if query.as_slice().iter().any(|x| !x.is_finite()) {
            return Err(Error::RetrievalFailure(
                "query vector has non-finite components".to_string(),
            ));
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let q = query.as_slice();
        let mut scored: Vec<(Reverse<OrderedFloat<f32>>, InternalIndex)> = self
            .vectors
            .par_chunks_exact(self.dim)
            .enumerate()
            .map(|(idx, row)| {
                (
                    Reverse(OrderedFloat(crate::simd::dot_product_simd(q, row))),
                    idx,
                )
            })
            .collect();

        if k < scored.len() {
            scored.select_nth_unstable(k - 1);
            scored.truncate(k);
        }
        scored.sort_unstable();

        Ok(scored.into_iter().map(|(_, idx)| idx).collect())
    }

    #[inline]
    fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.vectors.len() / self.dim
        }
    }

    #[inline]
    fn dim(&self) -> usize {
        self.dim
    }
}
