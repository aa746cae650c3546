use crate::manifest::{ArtifactFiles, ArtifactManifest, QualityRecord, MANIFEST_FILE};
use crate::matrix::{write_matrix, EmbeddingMatrix};
use anyhow::{anyhow, Context, Result};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// In-memory form of a model directory, as produced by the offline pipeline.
#[derive(Debug, Clone, Default)]
pub struct ArtifactBundle {
    pub embedding_dim: usize,
    pub item_vectors: Vec<Vec<f32>>,
    pub user_vectors: Vec<Vec<f32>>,
    /// Product id -> item row.
    pub product_index: Vec<(i64, usize)>,
    /// User id -> user row; `None` means user ids are row indices.
    pub user_index: Option<Vec<(i64, usize)>>,
    pub quality: Vec<QualityRecord>,
    pub item_vectors_normalized: bool,
}

/// Writes an [`ArtifactBundle`] in the layout [`crate::ArtifactLoader`] reads.
///
/// Data files go first; the manifest is written last and atomically, so a
/// directory with a manifest is always complete.
pub struct ArtifactWriter {
    model_dir: PathBuf,
    compress: bool,
    checksums: bool,
}

impl ArtifactWriter {
    pub fn new<P: AsRef<Path>>(model_dir: P) -> Self {
        Self {
            model_dir: model_dir.as_ref().to_path_buf(),
            compress: true,
            checksums: true,
        }
    }

    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn checksums(mut self, checksums: bool) -> Self {
        self.checksums = checksums;
        self
    }

    pub fn write(&self, bundle: &ArtifactBundle) -> Result<ArtifactManifest> {
        fs::create_dir_all(&self.model_dir)?;

        let ext = if self.compress { "bin.gz" } else { "bin" };
        let files = ArtifactFiles {
            item_embeddings: format!("item_embeddings.{}", ext),
            user_embeddings: format!("user_embeddings.{}", ext),
            product_mapping: ArtifactFiles::default().product_mapping,
            user_mapping: bundle
                .user_index
                .as_ref()
                .map(|_| "user_to_idx.json".to_string()),
            quality_scores: ArtifactFiles::default().quality_scores,
        };

        let dim = bundle.embedding_dim;
        write_matrix(
            &self.model_dir.join(&files.item_embeddings),
            &EmbeddingMatrix::from_rows(&bundle.item_vectors, dim)?,
        )
        .context("writing item embeddings")?;
        write_matrix(
            &self.model_dir.join(&files.user_embeddings),
            &EmbeddingMatrix::from_rows(&bundle.user_vectors, dim)?,
        )
        .context("writing user embeddings")?;

        write_json(
            &self.model_dir.join(&files.product_mapping),
            &index_object(&bundle.product_index),
        )?;
        if let (Some(file), Some(index)) = (&files.user_mapping, &bundle.user_index) {
            write_json(&self.model_dir.join(file), &index_object(index))?;
        }
        write_json(&self.model_dir.join(&files.quality_scores), &bundle.quality)?;

        let mut checksums = BTreeMap::new();
        if self.checksums {
            let mut names = vec![
                &files.item_embeddings,
                &files.user_embeddings,
                &files.product_mapping,
                &files.quality_scores,
            ];
            names.extend(files.user_mapping.as_ref());
            for name in names {
                let bytes = fs::read(self.model_dir.join(name))?;
                checksums.insert(name.clone(), format!("{:x}", Sha256::digest(&bytes)));
            }
        }

        let manifest = ArtifactManifest {
            embedding_dim: dim,
            num_users: bundle.user_vectors.len(),
            num_products: bundle.product_index.len(),
            item_vectors_normalized: bundle.item_vectors_normalized,
            files,
            checksums,
            created_at: Some(Utc::now()),
        };

        let json = serde_json::to_vec_pretty(&manifest)?;
        AtomicFile::new(
            self.model_dir.join(MANIFEST_FILE),
            OverwriteBehavior::AllowOverwrite,
        )
        .write(|f| f.write_all(&json))
        .map_err(|e| anyhow!("writing manifest: {}", e))?;

        Ok(manifest)
    }
}

/// `{"<id>": row}` in ascending id order; serde_json writes integer keys as
/// strings.
fn index_object(pairs: &[(i64, usize)]) -> BTreeMap<i64, usize> {
    pairs.iter().copied().collect()
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}
