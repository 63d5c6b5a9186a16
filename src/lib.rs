//! Ambient process stack (configuration, error taxonomy, metrics, HTTP
//! surface, stdio dispatch) wired around the `session-runtime` core.

pub mod config;
pub mod errors;
pub mod metrics;
pub mod server;
pub mod stdio;
pub mod tools;
