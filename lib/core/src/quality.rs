use crate::mapping::ExternalId;
use crate::{Error, Result};
use ahash::AHashMap;

/// Score assumed for products without a quality entry. The re-ranker treats
/// the same value as neutral, so both sides must read this constant.
pub const NEUTRAL_QUALITY_SCORE: f32 = 0.5;

/// Immutable product id -> health factor lookup.
#[derive(Debug, Clone, Default)]
pub struct QualityScoreTable {
    scores: AHashMap<ExternalId, f32>,
}

impl QualityScoreTable {
    /// Build from `(product id, score)` records. Scores must be finite and
    /// within `[0, 1]`; a product may appear only once.
    pub fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = (ExternalId, f32)>,
    {
        let mut scores = AHashMap::new();
        for (product_id, score) in records {
            if !score.is_finite() || !(0.0..=1.0).contains(&score) {
                return Err(Error::ArtifactCorrupt(format!(
                    "quality score {} for product {} is outside [0, 1]",
                    score, product_id
                )));
            }
            if scores.insert(product_id, score).is_some() {
                return Err(Error::ArtifactCorrupt(format!(
                    "product {} has more than one quality score",
                    product_id
                )));
            }
        }
        Ok(Self { scores })
    }

    #[inline]
    pub fn score(&self, id: ExternalId) -> f32 {
        self.scores.get(&id).copied().unwrap_or(NEUTRAL_QUALITY_SCORE)
    }

    #[inline]
    pub fn contains(&self, id: ExternalId) -> bool {
        self.scores.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}
