// src/api/server.rs
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;

use crate::error::CostingError;
use crate::ml::{extract_task_features, SharedCostModel};
use crate::models::task::{TagsField, TaskInput};

#[derive(Clone)]
struct AppState {
    model: SharedCostModel,
    model_path: PathBuf,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.to_string(),
        }
    }
}

impl From<CostingError> for ApiError {
    fn from(err: CostingError) -> Self {
        let status = match &err {
            CostingError::ModelNotTrained => StatusCode::SERVICE_UNAVAILABLE,
            CostingError::InvalidTrainingData(_) | CostingError::FeatureLengthMismatch { .. } => {
                StatusCode::BAD_REQUEST
            }
            CostingError::CorruptModelState(_)
            | CostingError::Io(_)
            | CostingError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Debug, Serialize)]
struct PredictResponse {
    predicted_cost: f64,
}

async fn predict_handler(
    State(state): State<AppState>,
    Json(task): Json<TaskInput>,
) -> Result<Json<PredictResponse>, ApiError> {
    let features = extract_task_features(&task);
    let model = state.model.read().await;
    let predicted_cost = model.predict(&features)?;
    Ok(Json(PredictResponse { predicted_cost }))
}

#[derive(Debug, Deserialize)]
struct UpdateRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: TagsField,
    actual_cost: Option<f64>,
}

#[derive(Debug, Serialize)]
struct UpdateResponse {
    status: String,
    predicted_cost: f64,
    samples_seen: u64,
}

async fn update_handler(
    State(state): State<AppState>,
    Json(req): Json<UpdateRequest>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let actual_cost = req
        .actual_cost
        .ok_or_else(|| ApiError::bad_request("actual_cost is required"))?;

    let task = TaskInput {
        title: req.title,
        description: req.description,
        tags: req.tags,
    };
    let features = extract_task_features(&task);

    let mut model = state.model.write().await;
    let predicted_cost = model.update(&features, actual_cost)?;

    // Snapshot while still holding the write guard, so artifacts on disk
    // never reorder against in-memory updates.
    if let Err(err) = model.save(&state.model_path) {
        warn!("Model updated but snapshot to disk failed: {}", err);
    }

    Ok(Json(UpdateResponse {
        status: "updated".to_string(),
        predicted_cost,
        samples_seen: model.samples_seen(),
    }))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    service: String,
    model_trained: bool,
    samples_seen: u64,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let model = state.model.read().await;
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "task_costing".to_string(),
        model_trained: model.is_trained(),
        samples_seen: model.samples_seen(),
    })
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict_handler))
        .route("/update", post(update_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Binds the listener and serves prediction, update, and health endpoints
/// until the process exits.
pub async fn serve(
    model: SharedCostModel,
    bind_addr: &str,
    model_path: PathBuf,
) -> anyhow::Result<()> {
    let router = build_router(AppState { model, model_path });

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Task costing API listening on http://{}", bind_addr);
    axum::serve(listener, router).await?;
    Ok(())
}
