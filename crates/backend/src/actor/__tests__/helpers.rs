//! Test helpers for actor integration tests.
//!
//! Provides transports that can be held open or made to panic, and
//! `WatchContext` which manages a temporary watch directory and builds
//! pipelines and watchers over it.

use std::{
  path::PathBuf,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::{
  actor::{
    pipeline::FilePipeline,
    watcher::{WatcherConfig, WatcherTask},
  },
  delivery::{
    DeliveryClient, HttpResponse, HttpTransport, RetryConfig, RetryController, TransportError,
    retry::tests::RecordingDelay,
  },
  domain::record::WireFields,
};

/// One well-formed line with a single measurement
pub const SAMPLE_RESULT: &str = "0042;;;;;;15/03/2024;;;;FOS;12,34;mg/dL\n";

/// Transport whose requests block until the test lets them through
pub struct GatedTransport {
  gate: Semaphore,
  calls: AtomicUsize,
}

impl GatedTransport {
  pub fn new() -> Self {
    Self {
      gate: Semaphore::new(0),
      calls: AtomicUsize::new(0),
    }
  }

  /// Let `n` pending or future requests complete with 200
  pub fn open(&self, n: usize) {
    self.gate.add_permits(n);
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  /// Wait until `n` requests have reached the transport
  pub async fn wait_calls(&self, n: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
      while self.calls() < n {
        tokio::time::sleep(Duration::from_millis(10)).await;
      }
    })
    .await
    .expect("requests never reached the transport");
  }
}

#[async_trait]
impl HttpTransport for GatedTransport {
  async fn post_json(&self, _url: &str, _body: Vec<u8>) -> Result<HttpResponse, TransportError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    let permit = self.gate.acquire().await.expect("gate closed");
    permit.forget();
    Ok(HttpResponse {
      status: 200,
      body: b"{}".to_vec(),
    })
  }
}

/// Transport that panics on every request
#[derive(Default)]
pub struct PanickingTransport {
  pub calls: AtomicUsize,
}

#[async_trait]
impl HttpTransport for PanickingTransport {
  async fn post_json(&self, _url: &str, _body: Vec<u8>) -> Result<HttpResponse, TransportError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    panic!("transport exploded");
  }
}

/// Pipeline over `transport` whose retry waits return immediately
pub fn pipeline(transport: Arc<dyn HttpTransport>, max_retries: u32) -> Arc<FilePipeline> {
  let client = DeliveryClient::new(transport, "http://lab.test/results", WireFields::default());
  let config = RetryConfig {
    max_retries,
    retry_interval: Duration::from_secs(60),
  };
  let retry = RetryController::new(client, config, Arc::new(RecordingDelay::default()));
  Arc::new(FilePipeline::new(retry))
}

/// Temporary watch directory plus the pieces to build a watcher over it
pub struct WatchContext {
  pub dir: TempDir,
  pub cancel: CancellationToken,
}

impl WatchContext {
  pub fn new() -> Self {
    Self {
      dir: TempDir::new().expect("create watch temp dir"),
      cancel: CancellationToken::new(),
    }
  }

  pub fn config(&self) -> WatcherConfig {
    WatcherConfig {
      root: self.dir.path().to_path_buf(),
      extension: ".RES".to_string(),
      scan_existing: false,
    }
  }

  pub fn write_result(&self, name: &str, content: &str) -> PathBuf {
    let path = self.dir.path().join(name);
    std::fs::write(&path, content).expect("write result file");
    path
  }

  pub fn watcher(&self, pipeline: Arc<FilePipeline>) -> WatcherTask {
    WatcherTask::new(self.config(), pipeline, self.cancel.clone()).expect("create watcher")
  }

  /// Poll until `cond` holds or the timeout elapses
  pub async fn wait_for(&self, timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
      if cond() {
        return true;
      }
      tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cond()
  }
}
