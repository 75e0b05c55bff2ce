//! Integration tests for the per-file pipeline.
//!
//! These run the real retry controller and filesystem cleanup against
//! scripted transports.

#[cfg(test)]
mod tests {
  use std::{path::PathBuf, sync::Arc};

  use async_trait::async_trait;

  use crate::{
    actor::{
      __tests__::helpers::{SAMPLE_RESULT, WatchContext, pipeline},
      pipeline::PipelineOutcome,
    },
    delivery::{
      HttpResponse, HttpTransport, TransportError,
      tests::{ScriptedTransport, ok, status},
    },
  };

  #[tokio::test]
  async fn test_delivered_file_is_deleted() {
    let ctx = WatchContext::new();
    let path = ctx.write_result("A.RES", SAMPLE_RESULT);
    let transport = Arc::new(ScriptedTransport::always(ok(r#"{"saved": 1}"#)));

    let outcome = pipeline(transport.clone(), 5).run(&path).await;

    assert_eq!(outcome, PipelineOutcome::Delivered { deleted: true });
    assert!(!path.exists());
    assert_eq!(transport.calls(), 1);

    let body = String::from_utf8(transport.bodies.lock().unwrap()[0].clone()).unwrap();
    assert!(body.contains("\"ID muestr\": \"0042\""));
    assert!(body.contains("\"FOS (mg/dL)\": \"12,3\""));
  }

  #[tokio::test]
  async fn test_exhausted_file_stays_on_disk() {
    let ctx = WatchContext::new();
    let path = ctx.write_result("A.RES", SAMPLE_RESULT);
    let transport = Arc::new(ScriptedTransport::always(status(500)));

    let outcome = pipeline(transport.clone(), 5).run(&path).await;

    assert_eq!(outcome, PipelineOutcome::Exhausted { attempts: 6 });
    assert!(path.exists());
    assert_eq!(transport.calls(), 6);
  }

  #[tokio::test]
  async fn test_success_after_failures_deletes_once() {
    let ctx = WatchContext::new();
    let path = ctx.write_result("A.RES", SAMPLE_RESULT);
    let transport = Arc::new(ScriptedTransport::new(
      vec![status(503), Err(TransportError::Timeout)],
      ok("{}"),
    ));

    let outcome = pipeline(transport.clone(), 5).run(&path).await;

    assert_eq!(outcome, PipelineOutcome::Delivered { deleted: true });
    assert_eq!(transport.calls(), 3);
    assert!(!path.exists());
  }

  #[tokio::test]
  async fn test_malformed_file_never_reaches_transport() {
    let ctx = WatchContext::new();
    let path = ctx.write_result("bad.RES", "0042;only;three\n");
    let transport = Arc::new(ScriptedTransport::always(ok("{}")));

    let outcome = pipeline(transport.clone(), 2).run(&path).await;

    assert_eq!(outcome, PipelineOutcome::Exhausted { attempts: 3 });
    assert_eq!(transport.calls(), 0);
    assert!(path.exists());
  }

  #[tokio::test]
  async fn test_empty_read_is_uploaded_and_deleted() {
    let ctx = WatchContext::new();
    let path = ctx.write_result("A.RES", "");
    let transport = Arc::new(ScriptedTransport::always(ok("{}")));

    let outcome = pipeline(transport.clone(), 5).run(&path).await;

    // Nothing to parse is not an error, so there is no retry to wait for the rest
    assert_eq!(outcome, PipelineOutcome::Delivered { deleted: true });
    assert_eq!(transport.calls(), 1);
    assert_eq!(transport.bodies.lock().unwrap()[0], b"[]".to_vec());
    assert!(!path.exists());
  }

  #[tokio::test]
  async fn test_keep_files_leaves_delivered_file() {
    let ctx = WatchContext::new();
    let path = ctx.write_result("A.RES", SAMPLE_RESULT);
    let transport = Arc::new(ScriptedTransport::always(ok("{}")));

    let pipeline = pipeline(transport, 5);
    let pipeline = Arc::try_unwrap(pipeline).ok().expect("sole owner").keep_files(true);

    assert_eq!(pipeline.run(&path).await, PipelineOutcome::Delivered { deleted: false });
    assert!(path.exists());
  }

  /// Accepts the upload but removes the file first, so cleanup fails
  struct StealingTransport {
    path: PathBuf,
  }

  #[async_trait]
  impl HttpTransport for StealingTransport {
    async fn post_json(&self, _url: &str, _body: Vec<u8>) -> Result<HttpResponse, TransportError> {
      std::fs::remove_file(&self.path).unwrap();
      Ok(HttpResponse {
        status: 201,
        body: Vec::new(),
      })
    }
  }

  #[tokio::test]
  async fn test_failed_delete_is_not_redelivered() {
    let ctx = WatchContext::new();
    let path = ctx.write_result("A.RES", SAMPLE_RESULT);
    let transport = Arc::new(StealingTransport { path: path.clone() });

    let outcome = pipeline(transport, 5).run(&path).await;

    assert_eq!(outcome, PipelineOutcome::Delivered { deleted: false });
  }
}
