use std::fmt;

use serde_json::Value;

use super::{EvaluationResult, Outcome, RelayError};
use crate::config::UpstreamConfig;
use crate::schema::Application;

const FALLBACK_UPSTREAM_MESSAGE: &str = "Upstream evaluation service error";

/// HTTP client for the upstream evaluation service. One attempt per call;
/// the configured timeout bounds the whole exchange.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    url: String,
    token: String,
    secret: String,
}

impl fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("url", &self.url)
            .field("token", &self.token)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            url: config.evaluations_url(),
            token: config.token.clone(),
            secret: config.secret.clone(),
        })
    }

    /// Forward a validated application and normalize the reply.
    pub async fn submit(&self, application: &Application) -> Result<EvaluationResult, RelayError> {
        let response = self
            .http
            .post(&self.url)
            .basic_auth(&self.token, Some(&self.secret))
            .json(application)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let raw = response
            .bytes()
            .await
            .map_err(classify_transport_error)?;
        let body = parse_body(&raw);

        if !status.is_success() {
            return Err(RelayError::Upstream {
                status: status.as_u16(),
                message: upstream_message(&body),
                details: body,
            });
        }

        Ok(normalize_success(body))
    }
}

/// Requests that never left the process are internal faults; everything else
/// means no usable response arrived.
fn classify_transport_error(err: reqwest::Error) -> RelayError {
    if err.is_builder() {
        RelayError::Server(err.to_string())
    } else {
        RelayError::TimeoutOrNetwork(err)
    }
}

/// JSON when it parses, the raw text when it doesn't, `null` when empty.
fn parse_body(raw: &[u8]) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(raw)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(raw).into_owned()))
}

fn non_empty_str<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

fn upstream_message(body: &Value) -> String {
    non_empty_str(body, "error")
        .or_else(|| non_empty_str(body, "message"))
        .unwrap_or(FALLBACK_UPSTREAM_MESSAGE)
        .to_string()
}

// A missing outcome is reported as Approved. See DESIGN.md.
fn normalize_success(body: Value) -> EvaluationResult {
    let summary = match body.get("summary") {
        Some(Value::Null) | None => Value::Object(Default::default()),
        Some(summary) => summary.clone(),
    };
    let outcome = non_empty_str(&summary, "outcome")
        .map(Outcome::from)
        .unwrap_or(Outcome::Approved);
    let evaluation_token = body
        .get("evaluation_token")
        .and_then(Value::as_str)
        .map(str::to_string);

    EvaluationResult::new(outcome, evaluation_token, summary)
}
