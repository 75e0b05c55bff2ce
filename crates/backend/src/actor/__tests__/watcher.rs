//! Integration tests for the directory watcher.
//!
//! Most tests feed synthetic notify events straight into the task so they do
//! not depend on platform event timing; the last ones go through the real
//! filesystem watcher.

#[cfg(test)]
mod tests {
  use std::{sync::Arc, time::Duration};

  use notify::{
    Event, EventKind,
    event::{CreateKind, ModifyKind, RenameMode},
  };
  use tokio::time::timeout;

  use crate::{
    actor::{
      __tests__::helpers::{GatedTransport, PanickingTransport, SAMPLE_RESULT, WatchContext, pipeline},
      watcher::{WatcherConfig, WatcherTask},
    },
    delivery::tests::{ScriptedTransport, ok},
  };

  fn created(path: &std::path::Path) -> Event {
    Event::new(EventKind::Create(CreateKind::File)).add_path(path.to_path_buf())
  }

  #[tokio::test]
  async fn test_duplicate_events_dispatch_once() {
    let ctx = WatchContext::new();
    let transport = Arc::new(GatedTransport::new());
    let mut watcher = ctx.watcher(pipeline(transport.clone(), 5));
    let path = ctx.write_result("A.RES", SAMPLE_RESULT);

    watcher.handle_event(created(&path));
    transport.wait_calls(1).await;

    // Same file announced again while its upload is still pending
    watcher.handle_event(created(&path));
    watcher.handle_event(Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To))).add_path(path.clone()));
    assert_eq!(watcher.in_flight(), 1);

    transport.open(1);
    let released = timeout(Duration::from_secs(5), watcher.settle_next()).await.unwrap();

    assert_eq!(released, Some(path.clone()));
    assert_eq!(watcher.in_flight(), 0);
    assert_eq!(transport.calls(), 1);
    assert!(!path.exists());
  }

  #[tokio::test]
  async fn test_filters_kind_extension_and_missing_paths() {
    let ctx = WatchContext::new();
    let transport = Arc::new(GatedTransport::new());
    let mut watcher = ctx.watcher(pipeline(transport.clone(), 5));

    let wrong_ext = ctx.write_result("notes.txt", SAMPLE_RESULT);
    let lower = ctx.write_result("A.res", SAMPLE_RESULT);
    let real = ctx.write_result("B.RES", SAMPLE_RESULT);
    let gone = ctx.dir.path().join("old.RES");

    watcher.handle_event(created(&wrong_ext));
    watcher.handle_event(created(&lower));
    watcher.handle_event(Event::new(EventKind::Modify(ModifyKind::Any)).add_path(real.clone()));
    watcher.handle_event(Event::new(EventKind::Remove(notify::event::RemoveKind::File)).add_path(real.clone()));
    assert_eq!(watcher.in_flight(), 0);

    // A rename reports both names; only the one that still exists is dispatched
    watcher.handle_event(
      Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
        .add_path(gone)
        .add_path(real.clone()),
    );
    assert_eq!(watcher.in_flight(), 1);

    transport.open(1);
    let released = timeout(Duration::from_secs(5), watcher.settle_next()).await.unwrap();
    assert_eq!(released, Some(real));
    assert_eq!(transport.calls(), 1);
  }

  #[tokio::test]
  async fn test_finished_path_can_be_dispatched_again() {
    let ctx = WatchContext::new();
    let transport = Arc::new(GatedTransport::new());
    transport.open(2);
    let mut watcher = ctx.watcher(pipeline(transport.clone(), 5));

    let path = ctx.write_result("A.RES", SAMPLE_RESULT);
    assert!(watcher.dispatch(path.clone()));
    timeout(Duration::from_secs(5), watcher.settle_next()).await.unwrap();
    assert!(!path.exists());

    ctx.write_result("A.RES", SAMPLE_RESULT);
    assert!(watcher.dispatch(path.clone()));
    timeout(Duration::from_secs(5), watcher.settle_next()).await.unwrap();

    assert_eq!(transport.calls(), 2);
    assert!(!path.exists());
  }

  #[tokio::test]
  async fn test_panicking_pipeline_releases_path() {
    let ctx = WatchContext::new();
    let transport = Arc::new(PanickingTransport::default());
    let mut watcher = ctx.watcher(pipeline(transport, 5));
    let path = ctx.write_result("A.RES", SAMPLE_RESULT);

    assert!(watcher.dispatch(path.clone()));
    let released = timeout(Duration::from_secs(5), watcher.settle_next())
      .await
      .expect("guard should be dropped during unwind");

    assert_eq!(released, Some(path.clone()));
    assert_eq!(watcher.in_flight(), 0);
    assert!(path.exists());
    assert!(watcher.dispatch(path));
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
  async fn test_watcher_delivers_renamed_in_file() {
    let ctx = WatchContext::new();
    let transport = Arc::new(ScriptedTransport::always(ok("{}")));
    let task = tokio::spawn(ctx.watcher(pipeline(transport.clone(), 5)).run());

    // Give watcher time to initialize
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Write under another name first so the watcher never sees a partial file
    let staging = ctx.write_result("A.tmp", SAMPLE_RESULT);
    let path = ctx.dir.path().join("A.RES");
    std::fs::rename(&staging, &path).unwrap();

    assert!(ctx.wait_for(Duration::from_secs(5), || !path.exists()).await);
    assert_eq!(transport.calls(), 1);
    let body = String::from_utf8(transport.bodies.lock().unwrap()[0].clone()).unwrap();
    assert!(body.contains("0042"));

    ctx.cancel.cancel();
    timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
  async fn test_scan_existing_dispatches_present_files() {
    let ctx = WatchContext::new();
    let first = ctx.write_result("A.RES", SAMPLE_RESULT);
    let second = ctx.write_result("B.RES", SAMPLE_RESULT);
    let other = ctx.write_result("C.txt", SAMPLE_RESULT);

    let transport = Arc::new(ScriptedTransport::always(ok("{}")));
    let config = WatcherConfig {
      scan_existing: true,
      ..ctx.config()
    };
    let watcher = WatcherTask::new(config, pipeline(transport.clone(), 5), ctx.cancel.clone()).unwrap();
    let task = tokio::spawn(watcher.run());

    assert!(
      ctx
        .wait_for(Duration::from_secs(5), || !first.exists() && !second.exists())
        .await
    );
    assert!(other.exists());
    assert_eq!(transport.calls(), 2);

    ctx.cancel.cancel();
    timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
  }

  #[tokio::test]
  async fn test_watcher_creates_missing_directory() {
    let ctx = WatchContext::new();
    let root = ctx.dir.path().join("nested").join("Quimica");
    let config = WatcherConfig {
      root: root.clone(),
      ..ctx.config()
    };
    let transport = Arc::new(GatedTransport::new());

    let watcher = WatcherTask::new(config, pipeline(transport, 5), ctx.cancel.clone()).unwrap();
    assert!(root.is_dir());

    ctx.cancel.cancel();
    timeout(Duration::from_secs(2), watcher.run()).await.unwrap();
  }
}
