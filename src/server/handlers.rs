//! HTTP request handlers.

use super::render;
use super::AppState;
use crate::error::{AlignmentError, PredictError, ValidationError};
use crate::metrics::MetricsSnapshot;
use crate::types::prediction::PredictionResponse;
use crate::types::record::InputRecord;
use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use std::time::Instant;
use tracing::{error, info};

/// Build all routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(show_form))
        .route("/predict", post(submit_form))
        .route("/api/predict", post(predict_json))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_snapshot))
}

/// Why a submission did not produce a prediction
#[derive(Debug)]
pub enum SubmitError {
    /// The request body could not be read as an input record
    Malformed(String),
    Invalid(ValidationError),
    Rejected(AlignmentError),
    Internal(PredictError),
    /// The blocking prediction task panicked or was cancelled
    Aborted(String),
}

impl SubmitError {
    fn status(&self) -> StatusCode {
        match self {
            SubmitError::Malformed(_) | SubmitError::Invalid(_) | SubmitError::Rejected(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            SubmitError::Internal(_) | SubmitError::Aborted(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            SubmitError::Malformed(_) => "malformed",
            SubmitError::Invalid(_) => "invalid",
            SubmitError::Rejected(_) => "rejected",
            SubmitError::Internal(_) | SubmitError::Aborted(_) => "internal",
        }
    }

    /// Message safe to show to the submitter
    fn message(&self) -> String {
        match self {
            SubmitError::Malformed(m) => m.clone(),
            SubmitError::Invalid(e) => e.to_string(),
            SubmitError::Rejected(e) => e.to_string(),
            SubmitError::Internal(_) | SubmitError::Aborted(_) => {
                "internal error while predicting; the failure has been logged".to_string()
            }
        }
    }
}

impl IntoResponse for SubmitError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.kind(),
            "message": self.message(),
        });
        (self.status(), Json(body)).into_response()
    }
}

/// Validate, align and predict one record.
fn run_prediction(state: &AppState, record: &InputRecord) -> Result<PredictionResponse, SubmitError> {
    record.validate().map_err(SubmitError::Invalid)?;

    let start = Instant::now();
    match state.engine.predict(record) {
        Ok(prediction) => {
            let elapsed = start.elapsed();
            state.metrics.record_prediction(elapsed, &prediction);
            let response = PredictionResponse::new(prediction, &state.insight);
            info!(
                prediction_id = %response.prediction_id,
                label = prediction.label.as_str(),
                probability = prediction.probability,
                processing_time_us = elapsed.as_micros(),
                "Prediction served"
            );
            Ok(response)
        }
        Err(PredictError::Rejected(e)) => {
            state.metrics.record_rejection();
            info!(error = %e, "Record rejected by encoder policy");
            Err(SubmitError::Rejected(e))
        }
        Err(e) => {
            state.metrics.record_internal_error();
            error!(error = %e, "Prediction failed");
            Err(SubmitError::Internal(e))
        }
    }
}

/// Run [`run_prediction`] on the blocking pool; classifier runs hold the
/// session lock for the whole inference.
async fn predict_blocking(state: AppState, record: InputRecord) -> Result<PredictionResponse, SubmitError> {
    let metrics = state.metrics.clone();
    tokio::task::spawn_blocking(move || run_prediction(&state, &record))
        .await
        .unwrap_or_else(|e| {
            metrics.record_internal_error();
            error!(error = %e, "Prediction task failed");
            Err(SubmitError::Aborted(e.to_string()))
        })
}

async fn show_form() -> Html<String> {
    Html(render::form_page(&InputRecord::default(), None))
}

async fn submit_form(
    State(state): State<AppState>,
    form: Result<Form<InputRecord>, FormRejection>,
) -> (StatusCode, Html<String>) {
    let record = match form {
        Ok(Form(record)) => record,
        Err(rejection) => {
            let err = SubmitError::Malformed(rejection.body_text());
            return (err.status(), Html(render::form_page(&InputRecord::default(), Some(&err.message()))));
        }
    };

    match predict_blocking(state, record.clone()).await {
        Ok(response) => (StatusCode::OK, Html(render::result_page(&response, &record))),
        Err(err) => (err.status(), Html(render::form_page(&record, Some(&err.message())))),
    }
}

async fn predict_json(
    State(state): State<AppState>,
    payload: Result<Json<InputRecord>, JsonRejection>,
) -> Result<Json<PredictionResponse>, SubmitError> {
    let Json(record) = payload.map_err(|rejection| SubmitError::Malformed(rejection.body_text()))?;
    predict_blocking(state, record).await.map(Json)
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let aligner = state.engine.aligner();
    Json(serde_json::json!({
        "status": "ok",
        "model": state.engine.model_name(),
        "features": aligner.feature_count(),
        "encoded_columns": aligner.encoder().width(),
        "unknown_category_policy": aligner.encoder().policy(),
        "decision_threshold": state.engine.decision_threshold(),
    }))
}

async fn metrics_snapshot(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
