use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use shuttle_axum::axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::debug;
use crate::kb::KnowledgeBase;
use crate::predict::{self, PredictError, Prediction};

#[derive(Clone)]
pub struct AppState {
    pub kb: Arc<KnowledgeBase>,
}

impl AppState {
    pub fn new(kb: KnowledgeBase) -> Self {
        Self { kb: Arc::new(kb) }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/features", get(get_features))
        .route("/predict", post(run_predict))
        .with_state(state)
        .merge(debug::router())
        .layer(CorsLayer::very_permissive())
}

#[derive(serde::Serialize)]
struct FeaturesResp {
    categories: BTreeMap<String, Vec<String>>,
}

/// The category/feature grouping, verbatim, for the client UI to render.
async fn get_features(State(state): State<AppState>) -> Json<FeaturesResp> {
    counter!("catalog_requests_total").increment(1);
    debug::record_catalog();
    Json(FeaturesResp {
        categories: state.kb.categories.clone(),
    })
}

#[derive(serde::Deserialize)]
struct PredictReq {
    selected_features: Vec<String>,
}

async fn run_predict(
    State(state): State<AppState>,
    Json(body): Json<PredictReq>,
) -> Result<Json<Prediction>, ApiError> {
    let started = Instant::now();
    counter!("predict_requests_total").increment(1);

    let unknown = body
        .selected_features
        .iter()
        .filter(|id| state.kb.feature(id).is_none())
        .count();
    if unknown > 0 {
        counter!("predict_unknown_feature_total").increment(unknown as u64);
    }

    let result = predict::predict(&state.kb, &body.selected_features);
    histogram!("predict_latency_ms").record(started.elapsed().as_secs_f64() * 1000.0);
    debug::record_predict(result.is_err());
    debug::record_latency(started.elapsed().as_millis());

    match result {
        Ok(prediction) => Ok(Json(prediction)),
        Err(e) => {
            match e {
                PredictError::EmptySelection => {
                    counter!("predict_empty_selection_total").increment(1)
                }
                PredictError::NoSignal => counter!("predict_no_signal_total").increment(1),
            }
            Err(ApiError(e))
        }
    }
}

/// Maps engine rejections onto client-correctable HTTP statuses, with the
/// `{"detail": ...}` body shape the UI expects.
pub struct ApiError(pub PredictError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            PredictError::EmptySelection => StatusCode::BAD_REQUEST,
            PredictError::NoSignal => StatusCode::UNPROCESSABLE_ENTITY,
        };
        (status, Json(serde_json::json!({ "detail": self.0.to_string() }))).into_response()
    }
}

impl From<PredictError> for ApiError {
    fn from(e: PredictError) -> Self {
        Self(e)
    }
}
