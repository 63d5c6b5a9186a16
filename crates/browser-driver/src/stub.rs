use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::driver::{Driver, NetworkEventKind, RawFrameEvent, RawNetworkEvent};
use crate::error::DriverError;

/// An in-memory driver that never launches a browser. Used by unit and
/// integration tests for the session runtime so they can exercise the full
/// create/step/snapshot/stop/replay loop deterministically and without a
/// Chrome binary on the test machine.
pub struct StubDriver {
    url: Mutex<String>,
    title: Mutex<String>,
    frame_seq: AtomicU64,
}

impl StubDriver {
    pub fn new(initial_url: impl Into<String>) -> Self {
        Self {
            url: Mutex::new(initial_url.into()),
            title: Mutex::new("Stub Page".to_string()),
            frame_seq: AtomicU64::new(0),
        }
    }

    pub fn set_url(&self, url: impl Into<String>) {
        *self.url.lock().unwrap() = url.into();
    }
}

#[async_trait]
impl Driver for StubDriver {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<(), DriverError> {
        self.set_url(url);
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.url.lock().unwrap().clone())
    }

    async fn title(&self) -> Result<String, DriverError> {
        Ok(self.title.lock().unwrap().clone())
    }

    async fn evaluate(&self, _script: &str) -> Result<serde_json::Value, DriverError> {
        Ok(serde_json::json!({
            "interactive_count": 4,
            "buttons": 1,
            "text_inputs": 1,
            "links": 2,
            "iframes": 0,
            "canvas_nodes": 0,
            "elements": [
                {"tag": "button", "id": "submit", "text": "Submit"},
                {"tag": "a", "id": null, "text": "Home"},
            ],
        }))
    }

    async fn accessibility_snapshot(&self) -> Result<serde_json::Value, DriverError> {
        Ok(serde_json::json!({"nodes": []}))
    }

    async fn selector_count(&self, selector: &str) -> Result<usize, DriverError> {
        Ok(if selector.is_empty() { 0 } else { 1 })
    }

    async fn click_selector(&self, _selector: &str, _timeout: Duration) -> Result<(), DriverError> {
        Ok(())
    }

    async fn click_coords(&self, _x: f64, _y: f64) -> Result<(), DriverError> {
        Ok(())
    }

    async fn hover_selector(&self, _selector: &str, _timeout: Duration) -> Result<(), DriverError> {
        Ok(())
    }

    async fn hover_coords(&self, _x: f64, _y: f64) -> Result<(), DriverError> {
        Ok(())
    }

    async fn type_selector(
        &self,
        _selector: &str,
        _text: &str,
        _timeout: Duration,
    ) -> Result<(), DriverError> {
        Ok(())
    }

    async fn type_coords(&self, _x: f64, _y: f64, _text: &str) -> Result<(), DriverError> {
        Ok(())
    }

    async fn press_key(&self, _key: &str) -> Result<(), DriverError> {
        Ok(())
    }

    async fn scroll(
        &self,
        _move_to: Option<(f64, f64)>,
        _delta_x: f64,
        _delta_y: f64,
    ) -> Result<(), DriverError> {
        Ok(())
    }

    async fn drag(&self, _x: f64, _y: f64, _delta_x: f64, _delta_y: f64) -> Result<(), DriverError> {
        Ok(())
    }

    async fn wait_for_selector(&self, _selector: &str, _timeout: Duration) -> Result<(), DriverError> {
        Ok(())
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) -> Result<(), DriverError> {
        Ok(())
    }

    async fn wait_for_dom_stable(&self, _timeout: Duration) -> Result<(), DriverError> {
        Ok(())
    }

    async fn start_screencast(
        &self,
        _quality: u32,
        _max_width: u32,
        _max_height: u32,
        _sink: mpsc::UnboundedSender<RawFrameEvent>,
    ) -> Result<(), DriverError> {
        Ok(())
    }

    async fn ack_frame(&self, _ack_session_id: &str) -> Result<(), DriverError> {
        Ok(())
    }

    async fn stop_screencast(&self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn subscribe_network(
        &self,
        _sink: mpsc::UnboundedSender<RawNetworkEvent>,
    ) -> Result<(), DriverError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        Ok(())
    }
}

impl StubDriver {
    /// Test helper: synthesize a frame event as if it came from a real screencast.
    pub fn next_frame_id(&self) -> u64 {
        self.frame_seq.fetch_add(1, Ordering::SeqCst)
    }

    pub fn synthetic_frame(&self, data_base64: Option<String>) -> RawFrameEvent {
        RawFrameEvent {
            ack_session_id: Some(self.next_frame_id().to_string()),
            data_base64,
            timestamp_ms: crate::now_ms(),
            device_width: 1280,
            device_height: 720,
        }
    }

    pub fn synthetic_network_event(&self, kind: NetworkEventKind, url: &str) -> RawNetworkEvent {
        RawNetworkEvent {
            kind,
            request_id: format!("stub-{}", self.next_frame_id()),
            url: url.to_string(),
            method: "GET".to_string(),
            status: Some(200),
            resource_type: Some("Document".to_string()),
            time_ms: crate::now_ms(),
            failure_text: None,
        }
    }
}
