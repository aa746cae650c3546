use nutrirank_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Candidates requested from the ANN index per query.
pub const DEFAULT_CANDIDATE_COUNT: usize = 100;

/// Maximum recommendations returned per request.
pub const DEFAULT_MAX_RESULTS: usize = 12;

/// Weight of the health factor when the caller does not send one.
pub const DEFAULT_GAMMA: f32 = 0.5;

/// Tuning knobs for the recommendation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub candidate_count: usize,
    pub max_results: usize,
    pub default_gamma: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            candidate_count: DEFAULT_CANDIDATE_COUNT,
            max_results: DEFAULT_MAX_RESULTS,
            default_gamma: DEFAULT_GAMMA,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_results == 0 {
            return Err(Error::InvalidConfig(
                "max_results must be at least 1".to_string(),
            ));
        }
        if self.candidate_count < self.max_results {
            return Err(Error::InvalidConfig(format!(
                "candidate_count ({}) must be >= max_results ({})",
                self.candidate_count, self.max_results
            )));
        }
        if !(0.0..=1.0).contains(&self.default_gamma) {
            return Err(Error::InvalidConfig(format!(
                "default_gamma {} is outside [0, 1]",
                self.default_gamma
            )));
        }
        Ok(())
    }

    /// Resolve a caller-supplied blend weight.
    ///
    /// Missing or non-finite values use the default; everything else is
    /// clamped to `[0, 1]` rather than rejected.
    pub fn resolve_gamma(&self, gamma: Option<f32>) -> f32 {
        match gamma {
            Some(g) if g.is_finite() => g.clamp(0.0, 1.0),
            _ => self.default_gamma,
        }
    }
}
