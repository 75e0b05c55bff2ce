//! Upload of parsed records to the results endpoint.
//!
//! [`DeliveryClient`] makes exactly one POST per call. Redelivery lives in
//! [`retry::RetryController`]; the HTTP stack sits behind [`HttpTransport`] so
//! both can be exercised without a network.

mod http;
pub mod retry;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

pub use http::ReqwestTransport;
pub use retry::{AttemptError, Delay, ExhaustedError, RetryConfig, RetryController, RetryState, TokioDelay};

use crate::domain::record::{Record, WireFields, to_wire_json};

/// Longest response body kept in a status error
const MAX_ERROR_BODY: usize = 512;

// ============================================================================
// Transport
// ============================================================================

/// Raw HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
  pub status: u16,
  pub body: Vec<u8>,
}

impl HttpResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// Failure before any HTTP status was received
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
  #[error("Request timed out")]
  Timeout,
  #[error("Connection failed: {0}")]
  Connect(String),
  #[error("Request failed: {0}")]
  Request(String),
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
  /// POST a JSON body and return whatever status the server answered with
  async fn post_json(&self, url: &str, body: Vec<u8>) -> Result<HttpResponse, TransportError>;
}

// ============================================================================
// Delivery Client
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
  #[error(transparent)]
  Transport(#[from] TransportError),
  #[error("Endpoint answered {status}: {body}")]
  Status { status: u16, body: String },
  #[error("Failed to encode records: {0}")]
  Encode(#[source] serde_json::Error),
}

/// A confirmed upload
#[derive(Debug, Clone, PartialEq)]
pub struct Delivered {
  pub status: u16,
  /// Response body as JSON, or as a JSON string when it was not JSON
  pub body: serde_json::Value,
}

#[derive(Clone)]
pub struct DeliveryClient {
  transport: Arc<dyn HttpTransport>,
  endpoint: String,
  fields: WireFields,
}

impl DeliveryClient {
  pub fn new(transport: Arc<dyn HttpTransport>, endpoint: impl Into<String>, fields: WireFields) -> Self {
    Self {
      transport,
      endpoint: endpoint.into(),
      fields,
    }
  }

  pub fn endpoint(&self) -> &str {
    &self.endpoint
  }

  /// Encode records as the request body
  pub fn encode(&self, records: &[Record]) -> Result<Vec<u8>, DeliveryError> {
    to_wire_json(records, &self.fields).map_err(DeliveryError::Encode)
  }

  /// Send the records in one request
  pub async fn deliver(&self, records: &[Record]) -> Result<Delivered, DeliveryError> {
    let body = self.encode(records)?;

    debug!(
      endpoint = %self.endpoint,
      records = records.len(),
      bytes = body.len(),
      "Posting records"
    );

    let response = self.transport.post_json(&self.endpoint, body).await?;

    if !response.is_success() {
      let body = truncate(&String::from_utf8_lossy(&response.body), MAX_ERROR_BODY);
      warn!(status = response.status, body = %body, "Endpoint rejected upload");
      return Err(DeliveryError::Status {
        status: response.status,
        body,
      });
    }

    let body = parse_body(&response.body);
    info!(status = response.status, response = %body, "Endpoint response");

    Ok(Delivered {
      status: response.status,
      body,
    })
  }
}

impl std::fmt::Debug for DeliveryClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DeliveryClient")
      .field("endpoint", &self.endpoint)
      .field("fields", &self.fields)
      .finish()
  }
}

fn parse_body(body: &[u8]) -> serde_json::Value {
  if body.is_empty() {
    return serde_json::Value::Null;
  }
  serde_json::from_slice(body).unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(body).into_owned()))
}

fn truncate(text: &str, max: usize) -> String {
  match text.char_indices().nth(max) {
    Some((idx, _)) => format!("{}...", &text[..idx]),
    None => text.to_string(),
  }
}
