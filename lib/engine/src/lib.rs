//! # nutrirank Engine
//!
//! Turns a (user, basket) pair into a ranked list of product ids.
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ user/basket │────>│ QueryVector │────>│  AnnIndex   │
//! │  (request)  │     │   Builder   │     │ (top-k rows)│
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                                                │
//!                      ┌─────────────┐           │
//!                      │  Reranker   │<──────────┘
//!                      │ pref+health │
//!                      └─────────────┘
//!                             │
//!                      ┌─────────────┐
//!                      │  top 12 ids │
//!                      └─────────────┘
//! ```
//!
//! The [`RecommendationContext`] holds every loaded artifact and is shared
//! read-only by all requests; [`Recommender`] sequences the stages and maps
//! failures onto the request.

pub mod config;
pub mod context;
pub mod query;
pub mod recommender;
pub mod rerank;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{EngineConfig, DEFAULT_CANDIDATE_COUNT, DEFAULT_GAMMA, DEFAULT_MAX_RESULTS};
pub use context::RecommendationContext;
pub use query::{BasketIndices, Query, QueryCase, QueryPlan, QueryVectorBuilder};
pub use recommender::{Recommendation, RecommendationRequest, Recommender};
pub use rerank::{fuse, RankedCandidate, Reranker};
