//! Translation between external identifiers and dense row indices.
//!
//! Two variants share one interface:
//!
//! - a *table* mapping built from a serialized forward map (product ids),
//!   with the reverse direction derived at build time
//! - an *identity* mapping over `[0, N)` where the external id already is
//!   the row index (user ids when no user mapping artifact is shipped)

use crate::{Error, Result};
use ahash::AHashMap;

/// Stable product or user identifier used by callers and artifacts.
pub type ExternalId = i64;

/// Dense zero-based row index into an embedding table.
pub type InternalIndex = usize;

#[derive(Debug, Clone)]
enum MappingKind {
    Table {
        forward: AHashMap<ExternalId, InternalIndex>,
        reverse: Vec<ExternalId>,
    },
    Identity {
        len: usize,
    },
}

/// Immutable bijection between [`ExternalId`] and [`InternalIndex`].
#[derive(Debug, Clone)]
pub struct IdentifierMapping {
    kind: MappingKind,
}

impl IdentifierMapping {
    /// Build a table mapping from `(external id, index)` pairs.
    ///
    /// The indices must cover `[0, N)` exactly once, where N is the number
    /// of pairs, and no external id may repeat.
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (ExternalId, InternalIndex)>,
    {
        let pairs: Vec<(ExternalId, InternalIndex)> = pairs.into_iter().collect();
        let n = pairs.len();

        let mut forward = AHashMap::with_capacity(n);
        let mut reverse: Vec<Option<ExternalId>> = vec![None; n];

        for (external_id, index) in pairs {
            if forward.insert(external_id, index).is_some() {
                return Err(Error::ArtifactCorrupt(format!(
                    "identifier {} appears more than once in mapping",
                    external_id
                )));
            }
            let slot = reverse.get_mut(index).ok_or_else(|| {
                Error::ArtifactCorrupt(format!(
                    "identifier {} maps to index {} outside [0, {})",
                    external_id, index, n
                ))
            })?;
            if let Some(previous) = slot.replace(external_id) {
                return Err(Error::ArtifactCorrupt(format!(
                    "index {} is claimed by both {} and {}",
                    index, previous, external_id
                )));
            }
        }

        // n distinct in-range indices fill every slot
        let reverse: Vec<ExternalId> = reverse.into_iter().flatten().collect();
        if reverse.len() != forward.len() {
            return Err(Error::ArtifactCorrupt(format!(
                "mapping cardinality mismatch: {} forward, {} reverse",
                forward.len(),
                reverse.len()
            )));
        }

        Ok(Self {
            kind: MappingKind::Table { forward, reverse },
        })
    }

    /// Mapping where every id in `[0, len)` is its own index.
    pub fn identity(len: usize) -> Self {
        Self {
            kind: MappingKind::Identity { len },
        }
    }

    #[inline]
    pub fn to_index(&self, id: ExternalId) -> Option<InternalIndex> {
        match &self.kind {
            MappingKind::Table { forward, .. } => forward.get(&id).copied(),
            MappingKind::Identity { len } => {
                usize::try_from(id).ok().filter(|idx| idx < len)
            }
        }
    }

    #[inline]
    pub fn to_external_id(&self, index: InternalIndex) -> Option<ExternalId> {
        match &self.kind {
            MappingKind::Table { reverse, .. } => reverse.get(index).copied(),
            MappingKind::Identity { len } => {
                if index < *len {
                    ExternalId::try_from(index).ok()
                } else {
                    None
                }
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.kind {
            MappingKind::Table { reverse, .. } => reverse.len(),
            MappingKind::Identity { len } => *len,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_identity(&self) -> bool {
        matches!(self.kind, MappingKind::Identity { .. })
    }

    /// External ids in index order.
    pub fn external_ids(&self) -> impl Iterator<Item = ExternalId> + '_ {
        (0..self.len()).filter_map(move |idx| self.to_external_id(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_bijection() {
        let mapping = IdentifierMapping::from_pairs([(101, 1), (202, 0), (7, 2)]).unwrap();
        assert_eq!(mapping.len(), 3);
        for id in [101, 202, 7] {
            let idx = mapping.to_index(id).unwrap();
            assert_eq!(mapping.to_external_id(idx), Some(id));
        }
        assert_eq!(mapping.external_ids().collect::<Vec<_>>(), vec![202, 101, 7]);
    }

    #[test]
    fn test_unknown_id_is_absent() {
        let mapping = IdentifierMapping::from_pairs([(101, 0)]).unwrap();
        assert_eq!(mapping.to_index(999), None);
        assert_eq!(mapping.to_external_id(1), None);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let err = IdentifierMapping::from_pairs([(101, 0), (101, 1)]).unwrap_err();
        assert!(matches!(err, Error::ArtifactCorrupt(_)));
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let err = IdentifierMapping::from_pairs([(101, 0), (202, 0)]).unwrap_err();
        assert!(matches!(err, Error::ArtifactCorrupt(_)));
    }

    #[test]
    fn test_index_out_of_range_rejected() {
        let err = IdentifierMapping::from_pairs([(101, 0), (202, 5)]).unwrap_err();
        assert!(matches!(err, Error::ArtifactCorrupt(_)));
    }

    #[test]
    fn test_identity_mapping() {
        let mapping = IdentifierMapping::identity(10);
        assert!(mapping.is_identity());
        assert_eq!(mapping.to_index(5), Some(5));
        assert_eq!(mapping.to_index(10), None);
        assert_eq!(mapping.to_index(-1), None);
        assert_eq!(mapping.to_external_id(9), Some(9));
        assert_eq!(mapping.to_external_id(10), None);
    }
}
