use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{trace, warn};

use super::{HttpResponse, HttpTransport, TransportError};

/// [`HttpTransport`] backed by a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
  client: reqwest::Client,
}

impl ReqwestTransport {
  pub fn new(request_timeout: Duration) -> Result<Self, reqwest::Error> {
    let client = reqwest::Client::builder().timeout(request_timeout).build()?;
    Ok(Self { client })
  }
}

fn classify(error: reqwest::Error) -> TransportError {
  if error.is_timeout() {
    TransportError::Timeout
  } else if error.is_connect() {
    TransportError::Connect(error.to_string())
  } else {
    TransportError::Request(error.to_string())
  }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
  async fn post_json(&self, url: &str, body: Vec<u8>) -> Result<HttpResponse, TransportError> {
    let start = Instant::now();

    let response = self
      .client
      .post(url)
      .header("Content-Type", "application/json")
      .body(body)
      .send()
      .await
      .map_err(|e| {
        warn!(error = %e, url, "Network error sending records");
        classify(e)
      })?;

    let status = response.status().as_u16();
    let body = response.bytes().await.map_err(classify)?.to_vec();

    trace!(
      status,
      bytes = body.len(),
      elapsed_ms = start.elapsed().as_millis(),
      "Received endpoint response"
    );

    Ok(HttpResponse { status, body })
  }
}
