//! # nutrirank Storage
//!
//! Reads and writes the model directory the recommendation engine serves
//! from:
//!
//! ```text
//! ml_models/
//! ├── manifest.json            sizes, file names, sha256 digests
//! ├── item_embeddings.bin.gz   bincode matrix, one row per product
//! ├── user_embeddings.bin.gz   bincode matrix, one row per user
//! ├── product_to_idx.json      {"<product id>": row}
//! ├── user_to_idx.json         optional, same shape
//! └── quality_scores.json      [{"product_id": .., "health_factor": ..}]
//! ```

pub mod loader;
pub mod manifest;
pub mod matrix;
pub mod writer;

pub use loader::{ArtifactLoader, ArtifactSummary};
pub use manifest::{ArtifactFiles, ArtifactManifest, QualityRecord, MANIFEST_FILE};
pub use matrix::{read_matrix, write_matrix, EmbeddingMatrix};
pub use writer::{ArtifactBundle, ArtifactWriter};
