//! Query vector construction.
//!
//! The query depends on which of the two signals is available:
//!
//! | user    | basket    | query                              |
//! |---------|-----------|------------------------------------|
//! | known   | empty     | user vector                        |
//! | known   | non-empty | `(user + mean(basket)) / 2`        |
//! | unknown | non-empty | `mean(basket)`                     |
//! | unknown | empty     | none, the request short-circuits   |
//!
//! Basket ids that do not map to a product row are dropped before the case
//! is chosen, so a basket of only unknown products counts as empty. The
//! query is always L2-normalized before it is returned.

use crate::context::RecommendationContext;
use nutrirank_core::{ExternalId, InternalIndex, Vector};
use serde::Serialize;
use smallvec::SmallVec;
use tracing::debug;

/// Which signals contributed to a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryCase {
    UserOnly,
    UserAndBasket,
    BasketOnly,
}

/// Basket ids resolved to item rows, in request order.
///
/// Duplicates are kept: a product added twice weighs twice in the mean.
#[derive(Debug, Clone, Default)]
pub struct BasketIndices {
    indices: SmallVec<[InternalIndex; 16]>,
    dropped: usize,
}

impl BasketIndices {
    #[inline]
    pub fn contains(&self, index: InternalIndex) -> bool {
        self.indices.contains(&index)
    }

    pub fn as_slice(&self) -> &[InternalIndex] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of basket ids that had no product mapping.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

/// A normalized query plus the basket rows to exclude from the results.
#[derive(Debug, Clone)]
pub struct Query {
    pub vector: Vector,
    pub case: QueryCase,
    pub basket: BasketIndices,
}

#[derive(Debug, Clone)]
pub enum QueryPlan {
    Ready(Query),
    /// Unknown user and nothing usable in the basket.
    Degenerate,
}

pub struct QueryVectorBuilder<'a> {
    context: &'a RecommendationContext,
}

impl<'a> QueryVectorBuilder<'a> {
    pub fn new(context: &'a RecommendationContext) -> Self {
        Self { context }
    }

    pub fn map_basket(&self, basket: &[ExternalId]) -> BasketIndices {
        let products = self.context.products();
        let mut mapped = BasketIndices::default();
        for &product_id in basket {
            match products.to_index(product_id) {
                Some(index) => mapped.indices.push(index),
                None => {
                    debug!(product_id, "dropping unmapped basket product");
                    mapped.dropped += 1;
                }
            }
        }
        mapped
    }

    /// Look up the stored vector for a caller-supplied user id. Ids the user
    /// mapping does not know, or that fall outside the user table, mean
    /// "unknown user".
    pub fn user_vector(&self, user_id: Option<ExternalId>) -> Option<&'a Vector> {
        let user_id = user_id?;
        let resolved = self
            .context
            .users()
            .to_index(user_id)
            .and_then(|index| self.context.embeddings().user_vector(index));
        if resolved.is_none() {
            debug!(user_id, "user not found, treating as unknown");
        }
        resolved
    }

    pub fn build(&self, user_id: Option<ExternalId>, basket: &[ExternalId]) -> QueryPlan {
        let user = self.user_vector(user_id);
        let basket = self.map_basket(basket);

        let embeddings = self.context.embeddings();
        // every mapped index is < num_items, so lookups cannot miss
        let basket_mean = Vector::mean(
            basket
                .as_slice()
                .iter()
                .filter_map(|&index| embeddings.item_vector(index)),
        );

        let (mut vector, case) = match (user, basket_mean) {
            (Some(user), None) => (user.clone(), QueryCase::UserOnly),
            (Some(user), Some(mean)) => (&(user + &mean) * 0.5, QueryCase::UserAndBasket),
            (None, Some(mean)) => (mean, QueryCase::BasketOnly),
            (None, None) => return QueryPlan::Degenerate,
        };
        vector.normalize();

        QueryPlan::Ready(Query {
            vector,
            case,
            basket,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_context;

    fn assert_close(a: &Vector, b: &Vector) {
        assert_eq!(a.dim(), b.dim());
        for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
            assert!((x - y).abs() < 1e-5, "{:?} != {:?}", a, b);
        }
    }

    fn ready(plan: QueryPlan) -> Query {
        match plan {
            QueryPlan::Ready(query) => query,
            QueryPlan::Degenerate => panic!("expected a query"),
        }
    }

    #[test]
    fn test_known_user_empty_basket_uses_user_vector() {
        let context = sample_context();
        let builder = QueryVectorBuilder::new(&context);
        let query = ready(builder.build(Some(5), &[]));

        let expected = context.embeddings().user_vector(5).unwrap().normalized();
        assert_eq!(query.case, QueryCase::UserOnly);
        assert_close(&query.vector, &expected);
        assert!(query.vector.is_unit());
    }

    #[test]
    fn test_known_user_with_basket_averages() {
        let context = sample_context();
        let builder = QueryVectorBuilder::new(&context);
        let query = ready(builder.build(Some(5), &[101, 202]));

        let e = context.embeddings();
        let user = e.user_vector(5).unwrap();
        let a = e.item_vector(context.products().to_index(101).unwrap()).unwrap();
        let b = e.item_vector(context.products().to_index(202).unwrap()).unwrap();
        let mean = &(a + b) * 0.5;
        let expected = (&(user + &mean) * 0.5).normalized();

        assert_eq!(query.case, QueryCase::UserAndBasket);
        assert_close(&query.vector, &expected);
        assert_eq!(query.basket.len(), 2);
    }

    #[test]
    fn test_unknown_user_basket_only() {
        let context = sample_context();
        let builder = QueryVectorBuilder::new(&context);
        let query = ready(builder.build(None, &[101]));

        let item = context
            .embeddings()
            .item_vector(context.products().to_index(101).unwrap())
            .unwrap();
        assert_eq!(query.case, QueryCase::BasketOnly);
        assert_close(&query.vector, &item.normalized());
    }

    #[test]
    fn test_out_of_range_user_is_unknown() {
        let context = sample_context();
        let builder = QueryVectorBuilder::new(&context);
        assert!(matches!(builder.build(Some(10_000), &[]), QueryPlan::Degenerate));
        assert!(matches!(builder.build(Some(-1), &[]), QueryPlan::Degenerate));

        let query = ready(builder.build(Some(10_000), &[202]));
        assert_eq!(query.case, QueryCase::BasketOnly);
    }

    #[test]
    fn test_unknown_user_empty_basket_is_degenerate() {
        let context = sample_context();
        let builder = QueryVectorBuilder::new(&context);
        assert!(matches!(builder.build(None, &[]), QueryPlan::Degenerate));
    }

    #[test]
    fn test_unmapped_basket_counts_as_empty() {
        let context = sample_context();
        let builder = QueryVectorBuilder::new(&context);
        assert!(matches!(builder.build(None, &[999, 998]), QueryPlan::Degenerate));

        let query = ready(builder.build(Some(5), &[999]));
        assert_eq!(query.case, QueryCase::UserOnly);
        assert_eq!(query.basket.dropped(), 1);
        assert!(query.basket.is_empty());
    }

    #[test]
    fn test_duplicate_basket_items_weigh_twice() {
        let context = sample_context();
        let builder = QueryVectorBuilder::new(&context);
        let query = ready(builder.build(None, &[101, 101, 202]));

        let e = context.embeddings();
        let a = e.item_vector(context.products().to_index(101).unwrap()).unwrap();
        let b = e.item_vector(context.products().to_index(202).unwrap()).unwrap();
        let expected = Vector::mean([a, a, b]).unwrap().normalized();
        assert_close(&query.vector, &expected);
        assert_eq!(query.basket.len(), 3);
    }
}
