//! URL allow/deny policy and the per-step action gate.

mod error;
mod gate;
mod url_policy;

pub use error::UrlPolicyError;
pub use gate::{ActionGate, PolicyDecision};
pub use url_policy::UrlPolicy;
pub use webagent_core_types::PolicyMode;
