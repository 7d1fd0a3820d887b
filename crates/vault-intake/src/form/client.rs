use serde_json::Value;

use crate::config::ClientConfig;
use crate::relay::EvaluationResult;
use crate::schema::Application;

/// Errors seen by the form when talking to the relay.
#[derive(Debug, thiserror::Error)]
pub enum RelayClientError {
    /// The relay answered with a non-2xx status.
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
        details: Option<Value>,
    },
    #[error("{0}")]
    Transport(#[source] reqwest::Error),
    #[error("unexpected response from relay: {0}")]
    Decode(#[source] serde_json::Error),
}

impl RelayClientError {
    /// Itemized violations carried by a `validation_error` body, if any.
    pub fn violations(&self) -> Vec<String> {
        let RelayClientError::Rejected {
            details: Some(details),
            ..
        } = self
        else {
            return Vec::new();
        };
        details
            .get("details")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Thin HTTP client for `POST /api/evaluations`. No timeout of its own; the
/// request waits as long as the transport allows.
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    url: String,
}

impl RelayClient {
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            url: format!(
                "{}/api/evaluations",
                config.relay_base.as_str().trim_end_matches('/')
            ),
        })
    }

    pub async fn submit(
        &self,
        application: &Application,
    ) -> Result<EvaluationResult, RelayClientError> {
        let response = self
            .http
            .post(&self.url)
            .json(application)
            .send()
            .await
            .map_err(RelayClientError::Transport)?;

        let status = response.status();
        let raw = response
            .bytes()
            .await
            .map_err(RelayClientError::Transport)?;

        if !status.is_success() {
            let details = serde_json::from_slice::<Value>(&raw).ok();
            let message = details
                .as_ref()
                .and_then(|body| {
                    body.get("message")
                        .and_then(Value::as_str)
                        .filter(|text| !text.is_empty())
                        .or_else(|| {
                            body.get("error")
                                .and_then(Value::as_str)
                                .filter(|text| !text.is_empty())
                        })
                })
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(RelayClientError::Rejected {
                status: status.as_u16(),
                message,
                details,
            });
        }

        serde_json::from_slice(&raw).map_err(RelayClientError::Decode)
    }
}
