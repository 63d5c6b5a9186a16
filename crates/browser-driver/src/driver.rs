use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::DriverError;

/// A screencast frame as delivered by the remote-debug channel, before the
/// Capture Coordinator's throttle/dedup logic runs.
#[derive(Clone, Debug)]
pub struct RawFrameEvent {
    /// Driver-assigned screencast session id, used to acknowledge the frame.
    /// `None` means the event carries no ack handle (treated as best-effort-dropped).
    pub ack_session_id: Option<String>,
    pub data_base64: Option<String>,
    pub timestamp_ms: u64,
    pub device_width: u32,
    pub device_height: u32,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkEventKind {
    Request,
    Response,
    Failure,
}

/// A raw request/response/failure observation from the page's network domain.
#[derive(Clone, Debug)]
pub struct RawNetworkEvent {
    pub kind: NetworkEventKind,
    pub request_id: String,
    pub url: String,
    pub method: String,
    pub status: Option<u16>,
    pub resource_type: Option<String>,
    pub time_ms: u64,
    pub failure_text: Option<String>,
}

/// Capability surface the session runtime needs from a controlled browser page.
/// Implemented by [`crate::chromium::ChromiumDriver`] against a real Chrome
/// instance and by [`crate::stub::StubDriver`] for tests that should not launch
/// a browser.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError>;
    async fn current_url(&self) -> Result<String, DriverError>;
    async fn title(&self) -> Result<String, DriverError>;

    /// Evaluate a JavaScript expression in the page and return its JSON value.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, DriverError>;

    /// `Accessibility.getFullAXTree` with `interestingOnly=true`, as an opaque JSON value.
    async fn accessibility_snapshot(&self) -> Result<serde_json::Value, DriverError>;

    async fn selector_count(&self, selector: &str) -> Result<usize, DriverError>;
    async fn click_selector(&self, selector: &str, timeout: Duration) -> Result<(), DriverError>;
    async fn click_coords(&self, x: f64, y: f64) -> Result<(), DriverError>;
    async fn hover_selector(&self, selector: &str, timeout: Duration) -> Result<(), DriverError>;
    async fn hover_coords(&self, x: f64, y: f64) -> Result<(), DriverError>;
    async fn type_selector(
        &self,
        selector: &str,
        text: &str,
        timeout: Duration,
    ) -> Result<(), DriverError>;
    async fn type_coords(&self, x: f64, y: f64, text: &str) -> Result<(), DriverError>;
    async fn press_key(&self, key: &str) -> Result<(), DriverError>;
    async fn scroll(
        &self,
        move_to: Option<(f64, f64)>,
        delta_x: f64,
        delta_y: f64,
    ) -> Result<(), DriverError>;
    async fn drag(&self, x: f64, y: f64, delta_x: f64, delta_y: f64) -> Result<(), DriverError>;

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), DriverError>;
    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<(), DriverError>;
    async fn wait_for_dom_stable(&self, timeout: Duration) -> Result<(), DriverError>;

    /// Start a JPEG screencast; frames are pushed to `sink` until [`Driver::stop_screencast`].
    async fn start_screencast(
        &self,
        quality: u32,
        max_width: u32,
        max_height: u32,
        sink: mpsc::UnboundedSender<RawFrameEvent>,
    ) -> Result<(), DriverError>;
    async fn ack_frame(&self, ack_session_id: &str) -> Result<(), DriverError>;
    async fn stop_screencast(&self) -> Result<(), DriverError>;

    /// Subscribe to request/response/failure events for the lifetime of the page.
    async fn subscribe_network(
        &self,
        sink: mpsc::UnboundedSender<RawNetworkEvent>,
    ) -> Result<(), DriverError>;

    /// Close page, context and browser, in that order, best-effort.
    async fn close(&self) -> Result<(), DriverError>;
}
