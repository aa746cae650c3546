use crate::mapping::InternalIndex;
use crate::{Error, Result, Vector};

/// How item rows are brought to unit length when the store is built.
///
/// Normalization happens exactly once, here. Normalizing an already
/// normalized table would be harmless numerically, but tables flagged as
/// normalized are verified instead so an unnormalized artifact is never
/// accepted silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemNormalization {
    /// Rows are raw; scale each to unit L2 norm.
    Normalize,
    /// Rows claim to be unit length; reject the table if any is not.
    Verify,
}

/// Read-only user and item embedding tables.
#[derive(Debug, Clone)]
pub struct EmbeddingStore {
    users: Vec<Vector>,
    items: Vec<Vector>,
    dim: usize,
}

impl EmbeddingStore {
    /// Build the store, validating shapes against the embedding dimension and
    /// the product mapping cardinality.
    pub fn new(
        users: Vec<Vector>,
        mut items: Vec<Vector>,
        dim: usize,
        num_products: usize,
        normalization: ItemNormalization,
    ) -> Result<Self> {
        if dim == 0 {
            return Err(Error::ArtifactCorrupt(
                "embedding dimension must be positive".to_string(),
            ));
        }
        check_dims("user embeddings", &users, dim)?;
        check_dims("item embeddings", &items, dim)?;
        check_finite("user embeddings", &users)?;
        check_finite("item embeddings", &items)?;

        if items.len() != num_products {
            return Err(Error::ArtifactDimensionMismatch {
                artifact: "item embedding rows vs product mapping".to_string(),
                expected: num_products,
                actual: items.len(),
            });
        }

        match normalization {
            ItemNormalization::Normalize => {
                for (row, item) in items.iter_mut().enumerate() {
                    if !item.normalize() {
                        return Err(Error::ArtifactCorrupt(format!(
                            "item embedding row {} has zero norm",
                            row
                        )));
                    }
                }
            }
            ItemNormalization::Verify => {
                if let Some(row) = items.iter().position(|item| !item.is_unit()) {
                    return Err(Error::ArtifactCorrupt(format!(
                        "item embedding row {} is not unit length (norm {})",
                        row,
                        items[row].norm()
                    )));
                }
            }
        }

        Ok(Self { users, items, dim })
    }

    #[inline]
    pub fn user_vector(&self, index: InternalIndex) -> Option<&Vector> {
        self.users.get(index)
    }

    #[inline]
    pub fn item_vector(&self, index: InternalIndex) -> Option<&Vector> {
        self.items.get(index)
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn num_users(&self) -> usize {
        self.users.len()
    }

    #[inline]
    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[Vector] {
        &self.items
    }
}

fn check_dims(artifact: &str, rows: &[Vector], dim: usize) -> Result<()> {
    match rows.iter().position(|row| row.dim() != dim) {
        Some(row) => Err(Error::ArtifactDimensionMismatch {
            artifact: format!("{} row {}", artifact, row),
            expected: dim,
            actual: rows[row].dim(),
        }),
        None => Ok(()),
    }
}

fn check_finite(artifact: &str, rows: &[Vector]) -> Result<()> {
    match rows.iter().position(|row| !row.is_finite()) {
        Some(row) => Err(Error::ArtifactCorrupt(format!(
            "{} row {} has non-finite components",
            artifact, row
        ))),
        None => Ok(()),
    }
}
