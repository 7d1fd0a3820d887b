use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::Value;

use super::{EvaluationRelay, RelayError};
use crate::schema::ValidationErrors;

/// Router exposing `POST /api/evaluations`.
pub fn evaluation_router(relay: Arc<EvaluationRelay>) -> Router {
    Router::new()
        .route("/api/evaluations", post(evaluate_handler))
        .with_state(relay)
}

pub(crate) async fn evaluate_handler(
    State(relay): State<Arc<EvaluationRelay>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    // Unreadable bodies get the same contract as schema failures.
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            return RelayError::from(ValidationErrors::payload(rejection.body_text()))
                .into_response()
        }
    };

    match relay.evaluate(&payload).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(err) => err.into_response(),
    }
}
