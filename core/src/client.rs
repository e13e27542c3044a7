//! Request builder, response parser and single-shot sender for the
//! conversion service.
//!
//! # Design
//! `ConversionClient` holds only the endpoint and a timeout. The exchange is
//! split into `build_convert` (produces an `HttpRequest`) and `parse_convert`
//! (consumes an `HttpResponse`), so hosts that do their own I/O can use the
//! client without a `Transport`. `send` glues the two halves around one
//! `Transport::execute` call and classifies everything that can go wrong
//! before a body exists. There are no retries.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::{Settings, DEFAULT_TIMEOUT_SECS};
use crate::error::ConversionError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::normalize::normalize;
use crate::transport::Transport;
use crate::types::{ConversionRequest, ConversionResult};

#[derive(Debug, Clone)]
pub struct ConversionClient {
    endpoint: String,
    timeout: Duration,
}

impl ConversionClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.endpoint()).with_timeout(settings.timeout())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn build_convert(&self, request: &ConversionRequest) -> Result<HttpRequest, ConversionError> {
        let body = serde_json::to_string(request)
            .map_err(|e| ConversionError::validation(format!("could not encode request: {e}")))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: self.endpoint.clone(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }

    /// Parse a received response into the canonical result.
    ///
    /// Unparsable JSON and any panic raised while normalizing are both
    /// reported as `MalformedResponse`.
    pub fn parse_convert(&self, response: HttpResponse) -> Result<ConversionResult, ConversionError> {
        if !response.is_success() {
            debug!(status = response.status, "service answered with a failure status");
        }
        let body: serde_json::Value = match serde_json::from_str(&response.body) {
            Ok(body) => body,
            Err(e) => {
                warn!(status = response.status, error = %e, "response body is not JSON");
                return Err(ConversionError::invalid_format());
            }
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| normalize(&body, response.status)))
            .unwrap_or_else(|_| Err(ConversionError::invalid_format()));

        if let Err(err) = &outcome {
            debug!(status = response.status, kind = %err.kind, "service response rejected");
        }
        outcome
    }

    /// Perform one bounded exchange with the service.
    pub async fn send<T>(
        &self,
        transport: &T,
        request: &ConversionRequest,
    ) -> Result<ConversionResult, ConversionError>
    where
        T: Transport + ?Sized,
    {
        let http_request = self.build_convert(request)?;

        let response = match tokio::time::timeout(self.timeout, transport.execute(http_request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                warn!(error = %err, "conversion request failed");
                return Err(err.into());
            }
            Err(_) => {
                let after = describe_duration(self.timeout);
                warn!(timeout = %after, "conversion request timed out");
                return Err(ConversionError::transport(format!("Request timed out after {after}")));
            }
        };

        self.parse_convert(response)
    }
}

/// Whole seconds render as `30s`; anything finer falls back to milliseconds.
fn describe_duration(duration: Duration) -> String {
    if duration.subsec_nanos() == 0 {
        format!("{}s", duration.as_secs())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
