//! Evaluation relay: re-validates applications, then either simulates an
//! outcome or forwards the application to the upstream evaluation service and
//! normalizes whatever comes back.

pub mod router;
mod simulator;
mod upstream;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::config::{AppConfig, EvaluationMode};
use crate::schema::{self, ValidationErrors};

pub use router::evaluation_router;
pub use simulator::{simulated_outcome, SIMULATED_TOKEN_PREFIX};
pub use upstream::UpstreamClient;

/// Decision reported for an evaluated application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Outcome {
    Approved,
    ManualReview,
    Denied,
    /// Any other string the upstream service chose to send.
    Other(String),
}

impl Outcome {
    pub fn as_str(&self) -> &str {
        match self {
            Outcome::Approved => "Approved",
            Outcome::ManualReview => "Manual Review",
            Outcome::Denied => "Denied",
            Outcome::Other(raw) => raw,
        }
    }
}

impl From<String> for Outcome {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Approved" => Outcome::Approved,
            "Manual Review" => Outcome::ManualReview,
            "Denied" => Outcome::Denied,
            _ => Outcome::Other(value),
        }
    }
}

impl From<&str> for Outcome {
    fn from(value: &str) -> Self {
        Outcome::from(value.to_string())
    }
}

impl From<Outcome> for String {
    fn from(value: Outcome) -> Self {
        match value {
            Outcome::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Success body of `POST /api/evaluations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub status: String,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_token: Option<String>,
    #[serde(default)]
    pub summary: Value,
}

impl EvaluationResult {
    pub fn new(outcome: Outcome, evaluation_token: Option<String>, summary: Value) -> Self {
        Self {
            status: "ok".to_string(),
            outcome,
            evaluation_token,
            summary,
        }
    }
}

/// Failure kinds surfaced to relay callers. Each maps to one wire `error`
/// string and one status code.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("application failed validation")]
    Validation(#[from] ValidationErrors),
    #[error("{message}")]
    Upstream {
        status: u16,
        message: String,
        details: Value,
    },
    #[error("No response from upstream evaluation service")]
    TimeoutOrNetwork(#[source] reqwest::Error),
    #[error("{0}")]
    Server(String),
}

impl RelayError {
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Validation(_) => "validation_error",
            RelayError::Upstream { .. } => "upstream_error",
            RelayError::TimeoutOrNetwork(_) => "timeout_or_network",
            RelayError::Server(_) => "server_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Validation(_) => StatusCode::BAD_REQUEST,
            RelayError::Upstream { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|code| code.is_client_error() || code.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            RelayError::TimeoutOrNetwork(_) => StatusCode::GATEWAY_TIMEOUT,
            RelayError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> Value {
        match self {
            RelayError::Validation(errors) => json!({
                "error": self.kind(),
                "details": errors.details(),
            }),
            RelayError::Upstream {
                status,
                message,
                details,
            } => json!({
                "error": self.kind(),
                "status": status,
                "message": message,
                "details": details,
            }),
            RelayError::TimeoutOrNetwork(_) | RelayError::Server(_) => json!({
                "error": self.kind(),
                "message": self.to_string(),
            }),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.body())).into_response()
    }
}

/// One relay per process. Holds no per-request state.
#[derive(Debug, Clone)]
pub struct EvaluationRelay {
    config: Arc<AppConfig>,
    upstream: UpstreamClient,
}

impl EvaluationRelay {
    pub fn new(config: Arc<AppConfig>) -> Result<Self, reqwest::Error> {
        let upstream = UpstreamClient::new(&config.upstream)?;
        Ok(Self { config, upstream })
    }

    /// Validate `payload`, then produce an outcome. Validation always finishes
    /// before the upstream service is contacted.
    pub async fn evaluate(&self, payload: &Value) -> Result<EvaluationResult, RelayError> {
        let application = schema::validate(payload).map_err(|errors| {
            warn!(violations = errors.len(), "rejected application payload");
            RelayError::from(errors)
        })?;

        let result = match self.config.mode {
            EvaluationMode::Simulated => Ok(simulator::simulate(&application)),
            EvaluationMode::Live => self.upstream.submit(&application).await,
        };

        match &result {
            Ok(evaluation) => info!(
                outcome = %evaluation.outcome,
                mode = self.config.mode.label(),
                "evaluation completed"
            ),
            Err(err @ RelayError::Server(_)) => {
                error!(kind = err.kind(), error = %err, "evaluation failed")
            }
            Err(err) => warn!(
                kind = err.kind(),
                status = err.status_code().as_u16(),
                error = %err,
                "evaluation failed"
            ),
        }

        result
    }
}
