//! Actor layer for result file handling
//!
//! ```text
//! notify ──► WatcherTask ──spawn──► FilePipeline ──► RetryController ──► endpoint
//!                ▲                      │
//!                └──── InFlightGuard ◄──┘ (released on drop)
//! ```
//!
//! The watcher owns the in-flight set. Every dispatched file runs in its own
//! task until it is delivered (and deleted) or its retries are exhausted.

pub mod inflight;
pub mod lifecycle;
pub mod pipeline;
mod startup_scan;
pub mod watcher;

#[cfg(test)]
mod __tests__;

pub use inflight::{InFlightGuard, InFlightSet};
pub use lifecycle::{DeleteError, finalize};
pub use pipeline::{FilePipeline, PipelineOutcome};
pub use watcher::{WatcherConfig, WatcherError, WatcherTask};
