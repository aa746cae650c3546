//! # nutrirank
//!
//! Health-weighted product recommendations.
//!
//! A request carries an optional user id, a basket of product ids and a
//! `gamma` weight. The engine builds a query vector from the user and basket
//! embeddings, retrieves candidates by inner product, drops what is already
//! in the basket and re-ranks the rest by
//! `(1 - gamma) * preference + gamma * health`.
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! nutrirank --model-dir ./ml_models --http-port 8080
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use nutrirank::prelude::*;
//! use std::sync::Arc;
//!
//! let (context, _summary) = ArtifactLoader::new("./ml_models").load()?;
//! let recommender = Recommender::new(Arc::new(context), EngineConfig::default())?;
//!
//! let ids = recommender.recommend(&RecommendationRequest {
//!     user_id: Some(42),
//!     basket_ids: vec![1001, 1002],
//!     gamma: Some(0.3),
//! })?;
//! println!("{:?}", ids);
//! # Ok::<(), nutrirank::Error>(())
//! ```
//!
//! ## Crate Structure
//!
//! - `nutrirank-core` - vectors, identifier mappings, embedding store, quality table, ANN index
//! - `nutrirank-engine` - query construction, re-ranking and orchestration
//! - `nutrirank-storage` - model directory reader and writer
//! - `nutrirank-api` - REST API

// Re-export core types
pub use nutrirank_core::{
    AnnIndex, EmbeddingStore, Error, ExternalId, FailureStage, FlatIndex, IdentifierMapping,
    InternalIndex, QualityScoreTable, Result, Vector, NEUTRAL_QUALITY_SCORE,
};

// Re-export engine
pub use nutrirank_engine::{
    EngineConfig, QueryCase, RankedCandidate, Recommendation, RecommendationContext,
    RecommendationRequest, Recommender,
};

// Re-export storage
pub use nutrirank_storage::{ArtifactBundle, ArtifactLoader, ArtifactSummary, ArtifactWriter};

// Re-export API
pub use nutrirank_api::{AppState, RestApi};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        AnnIndex, ArtifactLoader, EngineConfig, Error, ExternalId, RecommendationRequest,
        Recommender, Result, Vector,
    };
}
