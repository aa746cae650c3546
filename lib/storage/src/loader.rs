use crate::manifest::{ArtifactManifest, QualityRecord, MANIFEST_FILE};
use crate::matrix::read_matrix;
use chrono::{DateTime, Utc};
use nutrirank_core::{
    AnnIndex, EmbeddingStore, Error, ExternalId, FlatIndex, IdentifierMapping, InternalIndex,
    ItemNormalization, QualityScoreTable, Result,
};
use nutrirank_engine::RecommendationContext;
use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Sizes and provenance of a loaded bundle, for logs and the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactSummary {
    pub model_dir: PathBuf,
    pub products: usize,
    pub users: usize,
    pub embedding_dim: usize,
    pub quality_scores: usize,
    pub user_mapping: bool,
    pub item_vectors_normalized: bool,
    pub loaded_at: DateTime<Utc>,
}

/// Loads a model directory into an immutable [`RecommendationContext`].
///
/// Every failure is an artifact error; callers are expected to refuse to
/// serve rather than run on a partial bundle.
pub struct ArtifactLoader {
    model_dir: PathBuf,
}

impl ArtifactLoader {
    pub fn new<P: AsRef<Path>>(model_dir: P) -> Self {
        Self {
            model_dir: model_dir.as_ref().to_path_buf(),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn load_manifest(&self) -> Result<ArtifactManifest> {
        read_json(&self.model_dir.join(MANIFEST_FILE))
    }

    pub fn load(&self) -> Result<(RecommendationContext, ArtifactSummary)> {
        if !self.model_dir.is_dir() {
            return Err(Error::ArtifactMissing(format!(
                "model directory {}",
                self.model_dir.display()
            )));
        }

        let manifest = self.load_manifest()?;
        info!(
            dim = manifest.embedding_dim,
            users = manifest.num_users,
            products = manifest.num_products,
            "Loaded manifest from {:?}",
            self.model_dir
        );
        self.verify_checksums(&manifest)?;

        let products = self.load_product_mapping(&manifest)?;
        let users = self.load_user_mapping(&manifest)?;
        info!(
            products = products.len(),
            users = users.len(),
            identity_users = users.is_identity(),
            "Identifier mappings loaded"
        );

        let embeddings = self.load_embeddings(&manifest, products.len())?;
        info!(
            items = embeddings.num_items(),
            users = embeddings.num_users(),
            dim = embeddings.dim(),
            "Embedding tables loaded"
        );

        let quality = self.load_quality(&manifest)?;
        let covered = products
            .external_ids()
            .filter(|id| quality.contains(*id))
            .count();
        info!(
            scores = quality.len(),
            covered,
            "Quality scores loaded ({} products fall back to neutral)",
            products.len() - covered
        );

        let index: Arc<dyn AnnIndex> = Arc::new(FlatIndex::from_store(&embeddings));
        info!(rows = index.len(), "Flat inner-product index built");

        let summary = ArtifactSummary {
            model_dir: self.model_dir.clone(),
            products: products.len(),
            users: users.len(),
            embedding_dim: embeddings.dim(),
            quality_scores: quality.len(),
            user_mapping: !users.is_identity(),
            item_vectors_normalized: manifest.item_vectors_normalized,
            loaded_at: Utc::now(),
        };
        let context = RecommendationContext::new(products, users, embeddings, quality, index)?;
        Ok((context, summary))
    }

    fn verify_checksums(&self, manifest: &ArtifactManifest) -> Result<()> {
        for (file, expected) in &manifest.checksums {
            let path = self.model_dir.join(file);
            let bytes = fs::read(&path).map_err(|e| io_error(&path, e))?;
            let actual = format!("{:x}", Sha256::digest(&bytes));
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(Error::ArtifactCorrupt(format!(
                    "{}: sha256 {} does not match manifest {}",
                    file, actual, expected
                )));
            }
        }
        Ok(())
    }

    fn load_product_mapping(&self, manifest: &ArtifactManifest) -> Result<IdentifierMapping> {
        let path = self.model_dir.join(&manifest.files.product_mapping);
        let entries: MappingEntries = read_json(&path)?;
        let mapping = IdentifierMapping::from_pairs(entries.0)?;
        if mapping.len() != manifest.num_products {
            return Err(Error::ArtifactDimensionMismatch {
                artifact: manifest.files.product_mapping.clone(),
                expected: manifest.num_products,
                actual: mapping.len(),
            });
        }
        Ok(mapping)
    }

    fn load_user_mapping(&self, manifest: &ArtifactManifest) -> Result<IdentifierMapping> {
        let Some(file) = &manifest.files.user_mapping else {
            return Ok(IdentifierMapping::identity(manifest.num_users));
        };
        let entries: MappingEntries = read_json(&self.model_dir.join(file))?;
        let mapping = IdentifierMapping::from_pairs(entries.0)?;
        if mapping.len() != manifest.num_users {
            return Err(Error::ArtifactDimensionMismatch {
                artifact: file.clone(),
                expected: manifest.num_users,
                actual: mapping.len(),
            });
        }
        Ok(mapping)
    }

    fn load_embeddings(
        &self,
        manifest: &ArtifactManifest,
        num_products: usize,
    ) -> Result<EmbeddingStore> {
        let items_file = &manifest.files.item_embeddings;
        let users_file = &manifest.files.user_embeddings;

        let items = read_matrix(&self.model_dir.join(items_file))?;
        check_shape(items_file, items.dim, manifest.embedding_dim)?;
        let users = read_matrix(&self.model_dir.join(users_file))?;
        check_shape(users_file, users.dim, manifest.embedding_dim)?;
        if users.rows != manifest.num_users {
            return Err(Error::ArtifactDimensionMismatch {
                artifact: format!("{} rows", users_file),
                expected: manifest.num_users,
                actual: users.rows,
            });
        }

        let normalization = if manifest.item_vectors_normalized {
            ItemNormalization::Verify
        } else {
            ItemNormalization::Normalize
        };

        EmbeddingStore::new(
            users.into_vectors(users_file)?,
            items.into_vectors(items_file)?,
            manifest.embedding_dim,
            num_products,
            normalization,
        )
    }

    fn load_quality(&self, manifest: &ArtifactManifest) -> Result<QualityScoreTable> {
        let records: Vec<QualityRecord> =
            read_json(&self.model_dir.join(&manifest.files.quality_scores))?;
        QualityScoreTable::from_records(records.into_iter().map(|r| (r.product_id, r.health_factor)))
    }
}

fn check_shape(artifact: &str, dim: usize, expected: usize) -> Result<()> {
    if dim != expected {
        return Err(Error::ArtifactDimensionMismatch {
            artifact: artifact.to_string(),
            expected,
            actual: dim,
        });
    }
    Ok(())
}

fn io_error(path: &Path, e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::NotFound => Error::ArtifactMissing(path.display().to_string()),
        _ => Error::Io(e),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| Error::ArtifactCorrupt(format!("{}: {}", path.display(), e)))
}

/// `{"<external id>": index, ...}` kept as a list so that repeated keys
/// reach the mapping builder instead of being collapsed by a map type.
struct MappingEntries(Vec<(ExternalId, InternalIndex)>);

impl<'de> Deserialize<'de> for MappingEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = MappingEntries;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of integer-string keys to row indices")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, index)) = map.next_entry::<String, InternalIndex>()? {
                    let id = key.trim().parse::<ExternalId>().map_err(|_| {
                        serde::de::Error::custom(format!("identifier key {:?} is not an integer", key))
                    })?;
                    entries.push((id, index));
                }
                Ok(MappingEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}
