use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use weather_core::{HealthStatus, Relay, RelayError, ResponseEnvelope};

/// HTTP surface over a shared [`Relay`].
pub fn router(relay: Arc<Relay>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/weather", post(weather))
        .route("/weather/ai", post(weather_ai))
        .layer(TraceLayer::new_for_http())
        .with_state(relay)
}

/// `{"error": ...}` with the status the error kind calls for.
#[derive(Debug)]
pub struct ApiError(RelayError);

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

async fn health(State(relay): State<Arc<Relay>>) -> Json<HealthStatus> {
    Json(relay.health())
}

// Body is taken raw so malformed JSON gets our error body, not axum's rejection.
async fn weather(
    State(relay): State<Arc<Relay>>,
    body: Bytes,
) -> Result<Json<ResponseEnvelope>, ApiError> {
    Ok(Json(relay.get_weather(&body).await?))
}

async fn weather_ai(
    State(relay): State<Arc<Relay>>,
    body: Bytes,
) -> Result<Json<ResponseEnvelope>, ApiError> {
    Ok(Json(relay.get_weather_with_advice(&body).await?))
}
