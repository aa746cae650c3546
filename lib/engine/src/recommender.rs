use crate::config::EngineConfig;
use crate::context::RecommendationContext;
use crate::query::{Query, QueryCase, QueryPlan, QueryVectorBuilder};
use crate::rerank::{RankedCandidate, Reranker};
use nutrirank_core::{Error, ExternalId, InternalIndex, Result};
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

/// One recommendation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationRequest {
    #[serde(default)]
    pub user_id: Option<ExternalId>,
    #[serde(default)]
    pub basket_ids: Vec<ExternalId>,
    #[serde(default)]
    pub gamma: Option<f32>,
}

/// Ranked output of one request, with the scores behind it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Recommendation {
    /// `None` when the request was degenerate and nothing was retrieved.
    pub case: Option<QueryCase>,
    pub gamma: f32,
    pub candidates: Vec<RankedCandidate>,
}

impl Recommendation {
    pub fn product_ids(&self) -> Vec<ExternalId> {
        self.candidates.iter().map(|c| c.product_id).collect()
    }
}

/// Runs query construction, retrieval and re-ranking for each request.
///
/// Cheap to clone; clones share the same immutable artifacts.
#[derive(Debug, Clone)]
pub struct Recommender {
    context: Arc<RecommendationContext>,
    config: EngineConfig,
}

impl Recommender {
    pub fn new(context: Arc<RecommendationContext>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { context, config })
    }

    pub fn context(&self) -> &RecommendationContext {
        &self.context
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ordered product ids for `request`; empty for an unknown user with an
    /// empty basket.
    pub fn recommend(&self, request: &RecommendationRequest) -> Result<Vec<ExternalId>> {
        self.recommend_scored(request).map(|r| r.product_ids())
    }

    pub fn recommend_scored(&self, request: &RecommendationRequest) -> Result<Recommendation> {
        let gamma = self.config.resolve_gamma(request.gamma);

        let plan = QueryVectorBuilder::new(&self.context).build(request.user_id, &request.basket_ids);
        let query = match plan {
            QueryPlan::Ready(query) => query,
            QueryPlan::Degenerate => {
                debug!(
                    basket = request.basket_ids.len(),
                    "unknown user with empty basket, nothing to recommend"
                );
                return Ok(Recommendation {
                    case: None,
                    gamma,
                    candidates: Vec::new(),
                });
            }
        };

        let candidates = isolate_panic(request, || self.retrieve(&query))?;

        let reranker = Reranker::new(&self.context, self.config.max_results);
        let ranked = isolate_panic(request, || Ok(reranker.rerank(&query, &candidates, gamma)))?;

        debug!(
            case = ?query.case,
            basket_mapped = query.basket.len(),
            basket_dropped = query.basket.dropped(),
            candidates = candidates.len(),
            returned = ranked.len(),
            gamma,
            "recommendation computed"
        );

        Ok(Recommendation {
            case: Some(query.case),
            gamma,
            candidates: ranked,
        })
    }

    fn retrieve(&self, query: &Query) -> Result<Vec<InternalIndex>> {
        let k = self.config.candidate_count;
        let candidates = self
            .context
            .index()
            .search(&query.vector, k)
            .map_err(|e| {
                error!(error = %e, "candidate search failed");
                match e {
                    Error::RetrievalFailure(_) => e,
                    other => Error::RetrievalFailure(other.to_string()),
                }
            })?;
        if candidates.len() > k {
            error!(returned = candidates.len(), k, "index returned too many candidates");
            return Err(Error::RetrievalFailure(format!(
                "index returned {} candidates for k = {}",
                candidates.len(),
                k
            )));
        }
        Ok(candidates)
    }
}

/// Run one pipeline step, turning a panic into [`Error::UnexpectedFailure`]
/// so a single bad request cannot take the worker down.
fn isolate_panic<T, F>(request: &RecommendationRequest, step: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    catch_unwind(AssertUnwindSafe(step)).unwrap_or_else(|panic| {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "recommendation step panicked".to_string());
        error!(
            user_id = ?request.user_id,
            basket = ?request.basket_ids,
            %message,
            "recommendation step panicked"
        );
        Err(Error::UnexpectedFailure(message))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context_with_index, sample_context, ScriptedIndex};
    use nutrirank_core::{AnnIndex, FailureStage, NEUTRAL_QUALITY_SCORE};

    fn recommender() -> Recommender {
        Recommender::new(Arc::new(sample_context()), EngineConfig::default()).unwrap()
    }

    fn request(user_id: Option<ExternalId>, basket: &[ExternalId]) -> RecommendationRequest {
        RecommendationRequest {
            user_id,
            basket_ids: basket.to_vec(),
            gamma: None,
        }
    }

    #[test]
    fn test_degenerate_request_skips_retrieval() {
        let index = Arc::new(ScriptedIndex::new(Ok(vec![0, 1])));
        let probe = index.clone();
        let context = context_with_index(move |_| -> Arc<dyn AnnIndex> { index });
        let recommender = Recommender::new(Arc::new(context), EngineConfig::default()).unwrap();

        let result = recommender.recommend_scored(&request(None, &[])).unwrap();
        assert!(result.candidates.is_empty());
        assert!(result.case.is_none());
        assert_eq!(probe.calls(), 0);

        let result = recommender.recommend(&request(None, &[31337])).unwrap();
        assert!(result.is_empty());
        assert_eq!(probe.calls(), 0);
    }

    #[test]
    fn test_known_user_gets_recommendations() {
        let result = recommender().recommend(&request(Some(5), &[])).unwrap();
        assert_eq!(result.len(), 6);
    }

    #[test]
    fn test_basket_excluded_from_output() {
        let result = recommender()
            .recommend(&request(Some(1), &[202, 404, 999]))
            .unwrap();
        assert!(!result.contains(&202));
        assert!(!result.contains(&404));
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn test_output_bounded_by_max_results() {
        let config = EngineConfig {
            max_results: 3,
            ..EngineConfig::default()
        };
        let recommender = Recommender::new(Arc::new(sample_context()), config).unwrap();
        let result = recommender.recommend(&request(Some(0), &[])).unwrap();
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn test_gamma_is_clamped() {
        let recommender = recommender();
        let mut req = request(Some(0), &[]);
        req.gamma = Some(4.0);
        let high = recommender.recommend_scored(&req).unwrap();
        assert_eq!(high.gamma, 1.0);
        for c in &high.candidates {
            assert!((c.score - c.health).abs() < 1e-6);
        }

        req.gamma = Some(-1.0);
        let low = recommender.recommend_scored(&req).unwrap();
        assert_eq!(low.gamma, 0.0);
        for c in &low.candidates {
            assert!((c.score - c.preference).abs() < 1e-6);
        }
    }

    #[test]
    fn test_missing_quality_entry_scores_neutral() {
        let result = recommender()
            .recommend_scored(&request(Some(3), &[]))
            .unwrap();
        let unscored = result
            .candidates
            .iter()
            .find(|c| c.product_id == 606)
            .unwrap();
        assert_eq!(unscored.health, NEUTRAL_QUALITY_SCORE);
    }

    #[test]
    fn test_retrieval_failure_is_request_level() {
        let index = Arc::new(ScriptedIndex::new(Err(Error::RetrievalFailure(
            "index offline".to_string(),
        ))));
        let context = context_with_index(move |_| -> Arc<dyn AnnIndex> { index });
        let recommender = Recommender::new(Arc::new(context), EngineConfig::default()).unwrap();

        let err = recommender.recommend(&request(Some(0), &[])).unwrap_err();
        assert!(matches!(err, Error::RetrievalFailure(_)));
        assert_eq!(err.stage(), FailureStage::Request);

        // the next request is served the same way; nothing was poisoned
        let err = recommender.recommend(&request(Some(1), &[])).unwrap_err();
        assert!(matches!(err, Error::RetrievalFailure(_)));
    }

    #[test]
    fn test_oversized_candidate_list_rejected() {
        let config = EngineConfig {
            candidate_count: 12,
            ..EngineConfig::default()
        };
        let index = Arc::new(ScriptedIndex::new(Ok(vec![0; 13])));
        let context = context_with_index(move |_| -> Arc<dyn AnnIndex> { index });
        let recommender = Recommender::new(Arc::new(context), config).unwrap();

        let err = recommender.recommend(&request(Some(0), &[])).unwrap_err();
        assert!(matches!(err, Error::RetrievalFailure(_)));
    }

    #[test]
    fn test_panic_is_isolated_per_request() {
        let index = Arc::new(ScriptedIndex::panicking("corrupt graph node"));
        let calls = index.clone();
        let context = context_with_index(move |_| -> Arc<dyn AnnIndex> { index });
        let recommender = Recommender::new(Arc::new(context), EngineConfig::default()).unwrap();

        let err = recommender.recommend(&request(Some(0), &[])).unwrap_err();
        match &err {
            Error::UnexpectedFailure(message) => assert_eq!(message, "corrupt graph node"),
            other => panic!("expected UnexpectedFailure, got {:?}", other),
        }
        assert_eq!(err.stage(), FailureStage::Request);

        // the next request goes through the same index and succeeds
        let ids = recommender.recommend(&request(Some(1), &[202])).unwrap();
        assert_eq!(ids, vec![404, 303, 101]);
        assert_eq!(calls.calls(), 2);
    }

    #[test]
    fn test_panic_payloads_become_unexpected_failure() {
        let req = request(Some(0), &[]);

        let err = isolate_panic::<(), _>(&req, || panic!("row {} missing", 7)).unwrap_err();
        assert!(matches!(err, Error::UnexpectedFailure(ref m) if m == "row 7 missing"));

        let err = isolate_panic::<(), _>(&req, || std::panic::panic_any(42u8)).unwrap_err();
        assert!(matches!(err, Error::UnexpectedFailure(ref m) if m == "recommendation step panicked"));
        assert_eq!(err.stage(), FailureStage::Request);

        // errors and values pass through untouched
        assert_eq!(isolate_panic(&req, || Ok(5)).unwrap(), 5);
        let err = isolate_panic::<(), _>(&req, || Err(Error::RetrievalFailure("x".into())))
            .unwrap_err();
        assert!(matches!(err, Error::RetrievalFailure(_)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            max_results: 0,
            ..EngineConfig::default()
        };
        assert!(Recommender::new(Arc::new(sample_context()), config).is_err());
    }

    #[test]
    fn test_request_defaults_from_json() {
        let req: RecommendationRequest = serde_json::from_str(r#"{"user_id": 3}"#).unwrap();
        assert_eq!(req.user_id, Some(3));
        assert!(req.basket_ids.is_empty());
        assert!(req.gamma.is_none());

        let req: RecommendationRequest =
            serde_json::from_str(r#"{"user_id": null, "basket_ids": [1, 2, 2]}"#).unwrap();
        assert_eq!(req.basket_ids, vec![1, 2, 2]);
    }
}
