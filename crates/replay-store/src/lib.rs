//! Append-only, per-trace replay log: audit-reconstruction of a session's
//! observed create/step/snapshot/stop events, not re-execution.

mod error;
mod model;
mod store;

pub use error::ReplayError;
pub use model::{ReplayEvent, ReplayEventType, TraceIndex, TraceManifest};
pub use store::ReplayStore;
