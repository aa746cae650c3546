//! # nutrirank Core
//!
//! Immutable artifact types for the nutrirank recommendation engine.
//!
//! - [`IdentifierMapping`] - external product/user ids to dense row indices
//! - [`EmbeddingStore`] - user and unit-length item vectors
//! - [`QualityScoreTable`] - per-product health factor with a neutral default
//! - [`AnnIndex`] - nearest-neighbour search contract, with [`FlatIndex`] as
//!   the exact inner-product backend
//!
//! ## Example
//!
//! ```rust
//! use nutrirank_core::{
//!     AnnIndex, EmbeddingStore, FlatIndex, IdentifierMapping, ItemNormalization, Vector,
//! };
//!
//! let mapping = IdentifierMapping::from_pairs([(101, 0), (202, 1)]).unwrap();
//! let items = vec![Vector::new(vec![1.0, 0.0]), Vector::new(vec![0.0, 2.0])];
//! let store = EmbeddingStore::new(vec![], items, 2, mapping.len(), ItemNormalization::Normalize)
//!     .unwrap();
//!
//! let index = FlatIndex::from_store(&store);
//! let hits = index.search(&Vector::new(vec![0.0, 1.0]), 1).unwrap();
//! assert_eq!(mapping.to_external_id(hits[0]), Some(202));
//! ```

pub mod embedding;
pub mod error;
pub mod index;
pub mod mapping;
pub mod quality;
pub mod vector;

/// Dot product and norm kernels (AVX2/FMA on x86_64, scalar elsewhere)
pub mod simd;

pub use embedding::{EmbeddingStore, ItemNormalization};
pub use error::{Error, FailureStage, Result};
pub use index::{AnnIndex, FlatIndex};
pub use mapping::{ExternalId, IdentifierMapping, InternalIndex};
pub use quality::{QualityScoreTable, NEUTRAL_QUALITY_SCORE};
pub use vector::{Vector, UNIT_NORM_TOLERANCE};
