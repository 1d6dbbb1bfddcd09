use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use inference::{DispatchError, ModelRegistry, decode_image};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
}

/// Assembles the HTTP surface: inference routes plus a static file
/// fallback for the demo frontend.
pub fn build_router(state: AppState, static_dir: &str) -> Router {
    Router::new()
        .route("/invoke/*model", post(invoke_model))
        .route("/models", get(list_models))
        .route("/devices", get(list_devices))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Runs one posted image through the named model.
///
/// The wildcard segment is the model's configured path, so identifiers
/// with slashes route as-is. Error bodies are bare JSON strings.
async fn invoke_model(
    State(state): State<AppState>,
    Path(model): Path<String>,
    body: Bytes,
) -> Response {
    if body.is_empty() {
        return (StatusCode::BAD_REQUEST, Json("body is empty")).into_response();
    }

    let image = decode_image(&body);
    if image.is_empty() {
        return (StatusCode::BAD_REQUEST, Json("cannot get image from body")).into_response();
    }

    tracing::debug!(
        model = %model,
        bytes = body.len(),
        width = image.width,
        height = image.height,
        "Inference request"
    );

    match state.registry.dispatch(&model, image).await {
        Ok(detections) => Json(detections).into_response(),
        Err(e @ DispatchError::UnknownModel(_)) => {
            (StatusCode::NOT_FOUND, Json(e.to_string())).into_response()
        }
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, Json(e.to_string())).into_response(),
    }
}

async fn list_models(State(state): State<AppState>) -> Response {
    Json(state.registry.list_models()).into_response()
}

async fn list_devices(State(state): State<AppState>) -> Response {
    Json(state.registry.devices().to_vec()).into_response()
}
