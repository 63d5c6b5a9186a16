//! Merges DOM, accessibility, network and frame observations into one
//! [`StatePacket`] per step, with a SHA-1 state token for cheap change
//! detection (`INIT` / `NO_CHANGE` / `STATE_CHANGED`).

mod builder;
mod dom;
mod token;
mod types;

pub use builder::StateBuilder;
pub use dom::{parse_dom_summary, synthesize_regions, DOM_SUMMARY_SCRIPT};
pub use token::{compute_state_token, next_change_tokens};
pub use types::{DomSummary, IncludeFlags, InteractiveElement, RegionDetection, StatePacket};
