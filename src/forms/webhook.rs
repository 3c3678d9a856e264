use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;

use chrono::{SecondsFormat, Utc};
use gloo_net::http::Request;
use gloo_timers::callback::Timeout;
use gloo_timers::future::TimeoutFuture;
use log::{error, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use web_sys::AbortController;

use crate::config::{FormType, WebhookConfig};

/// JSON body posted to the automation webhook. Field names follow the
/// webhook's expected camelCase shape.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub form_type: String,
    pub source: String,
    pub submitted_at: String,
    pub fields: Map<String, Value>,
    pub metadata: Map<String, Value>,
}

impl SubmissionPayload {
    /// Builds a fresh payload stamped with the current time.
    pub fn new(form_type: FormType, source: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            form_type: form_type.as_str().to_string(),
            source: source.into(),
            submitted_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            fields,
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

/// Payload stamped with the page context: path as the source, browser
/// user agent in the metadata.
pub fn payload_from_browser(form_type: FormType, fields: Map<String, Value>) -> SubmissionPayload {
    let window = web_sys::window();
    let source = window
        .as_ref()
        .and_then(|w| w.location().pathname().ok())
        .unwrap_or_else(|| "/".to_string());
    let mut payload = SubmissionPayload::new(form_type, source, fields);
    if let Some(window) = window {
        if let Ok(agent) = window.navigator().user_agent() {
            payload = payload.with_metadata("userAgent", Value::String(agent));
        }
    }
    payload
}

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("no webhook URL configured for form type {0}")]
    NotConfigured(String),
    #[error("webhook did not respond within {0}ms")]
    Timeout(u32),
    #[error("webhook responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("network error: {0}")]
    Network(String),
}

/// Successful webhook response: parsed JSON body when the endpoint sends
/// one, otherwise just the status as an opaque success marker.
#[derive(Clone, Debug, PartialEq)]
pub struct WebhookResponse {
    pub status: u16,
    pub body: Option<Value>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay_ms: u32,
}

/// Drives submission attempts under a retry budget.
///
/// A timeout is terminal: the attempt is not retried and the error
/// surfaces immediately. Every other failure retries after a fixed delay
/// until the budget is spent, then the last error surfaces.
pub async fn submit_with_retry<A, FA, S, FS>(
    policy: RetryPolicy,
    mut attempt: A,
    sleep: S,
) -> Result<WebhookResponse, WebhookError>
where
    A: FnMut(u32) -> FA,
    FA: Future<Output = Result<WebhookResponse, WebhookError>>,
    S: Fn(u32) -> FS,
    FS: Future<Output = ()>,
{
    let mut last_error = None;
    for n in 0..=policy.attempts {
        match attempt(n).await {
            Ok(response) => return Ok(response),
            Err(WebhookError::Timeout(ms)) => return Err(WebhookError::Timeout(ms)),
            Err(err) => {
                warn!("submission attempt {} failed: {err}", n + 1);
                last_error = Some(err);
                if n < policy.attempts {
                    sleep(policy.delay_ms).await;
                }
            }
        }
    }
    let err = last_error.unwrap_or_else(|| WebhookError::Network("submission failed".to_string()));
    error!("submission failed after {} attempts: {err}", policy.attempts + 1);
    Err(err)
}

/// Posts payloads to the configured endpoint for one form type, with a
/// hard per-attempt timeout enforced through an abort signal.
pub struct WebhookClient {
    url: String,
    timeout_ms: u32,
    policy: RetryPolicy,
}

impl WebhookClient {
    pub fn for_form(config: &WebhookConfig, form_type: FormType) -> Result<Self, WebhookError> {
        if !config.enabled {
            return Err(WebhookError::NotConfigured(form_type.as_str().to_string()));
        }
        let url = config.url_for(form_type);
        if url.trim().is_empty() {
            return Err(WebhookError::NotConfigured(form_type.as_str().to_string()));
        }
        Ok(Self {
            url: url.to_string(),
            timeout_ms: config.timeout_ms,
            policy: RetryPolicy {
                attempts: config.retry_attempts,
                delay_ms: config.retry_delay_ms,
            },
        })
    }

    pub async fn submit(&self, payload: &SubmissionPayload) -> Result<WebhookResponse, WebhookError> {
        submit_with_retry(
            self.policy,
            |_attempt| self.send_once(payload),
            |delay_ms| TimeoutFuture::new(delay_ms),
        )
        .await
    }

    async fn send_once(&self, payload: &SubmissionPayload) -> Result<WebhookResponse, WebhookError> {
        let controller = AbortController::new()
            .map_err(|_| WebhookError::Network("failed to create abort controller".to_string()))?;
        let timed_out = Rc::new(Cell::new(false));

        let timeout = {
            let controller = controller.clone();
            let timed_out = timed_out.clone();
            Timeout::new(self.timeout_ms, move || {
                timed_out.set(true);
                controller.abort();
            })
        };

        let request = Request::post(&self.url)
            .abort_signal(Some(&controller.signal()))
            .json(payload)
            .map_err(|err| WebhookError::Network(err.to_string()))?;

        let result = request.send().await;
        // dropping the handle cancels the pending abort
        drop(timeout);

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                if timed_out.get() {
                    return Err(WebhookError::Timeout(self.timeout_ms));
                }
                return Err(WebhookError::Network(err.to_string()));
            }
        };

        if !response.ok() {
            let body = response.text().await.unwrap_or_default();
            return Err(WebhookError::Status {
                status: response.status(),
                body,
            });
        }

        let is_json = response
            .headers()
            .get("content-type")
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false);
        if is_json {
            let body = response
                .json::<Value>()
                .await
                .map_err(|err| WebhookError::Network(err.to_string()))?;
            Ok(WebhookResponse {
                status: response.status(),
                body: Some(body),
            })
        } else {
            Ok(WebhookResponse {
                status: response.status(),
                body: None,
            })
        }
    }
}
