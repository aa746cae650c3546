use actix_cors::Cors;
use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer, Result as ActixResult};
use nutrirank_core::{Error, ExternalId};
use nutrirank_engine::{QueryCase, RankedCandidate, RecommendationRequest, Recommender};
use nutrirank_storage::ArtifactSummary;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info_span};
use uuid::Uuid;

/// Shared, read-only state handed to every worker.
pub struct AppState {
    pub recommender: Recommender,
    pub summary: ArtifactSummary,
}

#[derive(Deserialize)]
struct RecommendRequest {
    #[serde(flatten)]
    request: RecommendationRequest,
    #[serde(default)]
    explain: bool,
}

#[derive(Serialize)]
struct RecommendResponse {
    recommendations: Vec<ExternalId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    case: Option<QueryCase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scores: Option<Vec<RankedCandidate>>,
}

#[derive(Serialize)]
struct HealthResponse<'a> {
    status: &'static str,
    #[serde(flatten)]
    summary: &'a ArtifactSummary,
}

pub struct RestApi;

impl RestApi {
    pub async fn start(state: Arc<AppState>, port: u16) -> std::io::Result<()> {
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(web::Data::new(state.clone()))
                .configure(RestApi::configure)
        })
        .bind(("0.0.0.0", port))?
        .run()
        .await
    }

    /// Routes and extractor settings, shared by the server and tests.
    pub fn configure(cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::JsonConfig::default().error_handler(json_error))
            .route("/recommend", web::post().to(recommend))
            .route("/health", web::get().to(health));
    }
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let body = serde_json::json!({
        "error": format!("Malformed request: {}", err),
        "stage": "request",
    });
    InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
}

fn failure_body(e: &Error) -> serde_json::Value {
    let message = match e {
        Error::RetrievalFailure(_) => "Failed during candidate search.",
        _ => "Could not process the request.",
    };
    serde_json::json!({
        "error": message,
        "stage": e.stage().as_str(),
    })
}

async fn recommend(
    state: web::Data<Arc<AppState>>,
    req: web::Json<RecommendRequest>,
) -> ActixResult<HttpResponse> {
    let request_id = Uuid::new_v4();
    let span = info_span!("recommend", %request_id, user_id = ?req.request.user_id);
    let _guard = span.enter();

    match state.recommender.recommend_scored(&req.request) {
        Ok(result) => {
            let response = RecommendResponse {
                recommendations: result.product_ids(),
                case: if req.explain { result.case } else { None },
                scores: req.explain.then_some(result.candidates),
            };
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            error!(error = %e, basket = ?req.request.basket_ids, "recommendation failed");
            Ok(HttpResponse::InternalServerError().json(failure_body(&e)))
        }
    }
}

async fn health(state: web::Data<Arc<AppState>>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        summary: &state.summary,
    }))
}
