//! Bounded, acknowledgement-driven visual frame capture.
//!
//! The [`CaptureCoordinator`] runs independently of the step control loop: frame
//! events arrive from the driver's screencast, pass through an adaptive
//! throttle, and land on a fixed-capacity [`FrameRing`]. The two loops never
//! share a lock across a suspension point — the ring is always read via a
//! snapshot copy.

mod coordinator;
mod ring;

pub use coordinator::{resolve_frame_cap, CaptureConfig, CaptureCoordinator, QueueHealth};
pub use ring::{FrameMetadata, FrameRef, FrameRing};
