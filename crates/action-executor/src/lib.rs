//! Single-action dispatch: one action per call, DOM-first with a coordinate
//! fallback, under a caller-supplied timeout and a hard outer deadline.
//!
//! Every executed action — successful or not — appends a synthetic network
//! event so it is causally interleaved with the page's own request/response
//! traffic in the state packet's network view.

mod errors;
mod executor;
mod types;
mod validate;

pub use errors::{ActionError, ValidationError};
pub use executor::{effective_timeout_ms, execute, is_retryable_failure};
pub use types::{ActionInput, ActionKind, ActionResult};
pub use validate::validate_action;
