//! The indexing side of the system: change tracking, the per-file
//! pipeline, the directory watcher, and the engine that runs them.

pub mod engine;
pub mod pipeline;
pub mod registry;
pub mod watch;
