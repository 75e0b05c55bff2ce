pub mod actor;
pub mod delivery;
pub mod parser;

mod domain;
pub use domain::{config, record};

pub mod dirs;

pub use actor::{FilePipeline, PipelineOutcome, WatcherConfig, WatcherError};

mod daemon;
pub use daemon::{Daemon, DaemonError, RuntimeConfig, build_pipeline};
