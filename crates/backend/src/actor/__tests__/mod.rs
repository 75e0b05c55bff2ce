mod helpers;
mod pipeline;
mod watcher;
