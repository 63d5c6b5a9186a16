use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use base64::Engine;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};
use webagent_core_types::{now_epoch_ms, CaptureProfile, SessionId, TraceId};

use browser_driver::{Driver, RawFrameEvent};

use crate::ring::{FrameMetadata, FrameRef, FrameRing};

const BURST_INTERVAL_MS: u64 = 125;
const STEADY_INTERVAL_MS: u64 = 333;
const BURST_DURATION_MS: u64 = 2_000;

/// Sampled observability counters, attached to every state packet as `queue_health`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct QueueHealth {
    pub frame_queue_depth: usize,
    pub frame_queue_max: usize,
    pub frames_dropped: u64,
    pub frames_pending_ack: i64,
}

/// Resolve the effective frame-ring capacity for a session.
///
/// `cap = clamp(request_max, 2, 20)` if provided else 8; for `frames_only` use
/// `cap` directly, otherwise further clamp to `[3, 12]`.
pub fn resolve_frame_cap(profile: CaptureProfile, requested_max: Option<u32>) -> u32 {
    let cap = requested_max.map(|m| m.clamp(2, 20)).unwrap_or(8);
    match profile {
        CaptureProfile::FramesOnly => cap,
        _ => cap.clamp(3, 12),
    }
}

#[derive(Clone, Debug)]
pub struct CaptureConfig {
    pub enabled: bool,
    pub session_id: SessionId,
    pub trace_id: TraceId,
    pub quality: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub max_frames: u32,
    pub adaptive: bool,
    pub trace_dir: PathBuf,
}

/// Maintains a bounded recent-frames ring fed by an asynchronous driver
/// screencast, guaranteeing every delivered frame is acknowledged so the
/// driver never stalls waiting on backpressure from this side.
pub struct CaptureCoordinator {
    driver: Arc<dyn Driver>,
    config: CaptureConfig,
    ring: Mutex<FrameRing>,
    active: AtomicBool,
    pending_ack: AtomicI64,
    last_captured_ms: AtomicU64,
    burst_until_ms: AtomicU64,
    seq: AtomicU64,
    first_frame_seen: AtomicBool,
}

impl CaptureCoordinator {
    pub fn new(driver: Arc<dyn Driver>, config: CaptureConfig) -> Self {
        let capacity = config.max_frames.max(1) as usize;
        Self {
            driver,
            config,
            ring: Mutex::new(FrameRing::new(capacity)),
            active: AtomicBool::new(false),
            pending_ack: AtomicI64::new(0),
            last_captured_ms: AtomicU64::new(0),
            burst_until_ms: AtomicU64::new(0),
            seq: AtomicU64::new(0),
            first_frame_seen: AtomicBool::new(false),
        }
    }

    pub async fn start(self: &Arc<Self>) -> Result<(), browser_driver::DriverError> {
        if !self.config.enabled || self.active.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<RawFrameEvent>();
        self.driver
            .start_screencast(self.config.quality, self.config.max_width, self.config.max_height, tx)
            .await?;

        let this = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if !this.active.load(Ordering::SeqCst) {
                    break;
                }
                this.handle_frame_event(event).await;
            }
        });

        Ok(())
    }

    async fn handle_frame_event(&self, event: RawFrameEvent) {
        self.pending_ack.fetch_add(1, Ordering::SeqCst);

        let keep = self.should_keep(event.timestamp_ms);
        if keep {
            if let Some(data) = &event.data_base64 {
                if let Err(err) = self.capture_and_store(event.timestamp_ms, event.device_width, event.device_height, data).await {
                    warn!(?err, "failed to persist captured frame");
                }
            }
        }

        if let Some(ack_id) = &event.ack_session_id {
            if let Err(err) = self.driver.ack_frame(ack_id).await {
                debug!(?err, "best-effort frame ack failed");
            }
        }

        self.pending_ack.fetch_sub(1, Ordering::SeqCst);
    }

    fn should_keep(&self, now_ms: u64) -> bool {
        if !self.first_frame_seen.swap(true, Ordering::SeqCst) {
            self.last_captured_ms.store(now_ms, Ordering::SeqCst);
            return true;
        }

        let burst_until = self.burst_until_ms.load(Ordering::SeqCst);
        let interval = if now_ms < burst_until {
            BURST_INTERVAL_MS
        } else {
            STEADY_INTERVAL_MS
        };

        let last = self.last_captured_ms.load(Ordering::SeqCst);
        if now_ms.saturating_sub(last) >= interval {
            self.last_captured_ms.store(now_ms, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    async fn capture_and_store(
        &self,
        timestamp_ms: u64,
        width: u32,
        height: u32,
        data_base64: &str,
    ) -> Result<(), std::io::Error> {
        let start = std::time::Instant::now();
        let raw = base64::engine::general_purpose::STANDARD
            .decode(data_base64)
            .unwrap_or_default();

        let mut hasher = Sha1::new();
        hasher.update(&raw);
        let checksum = hex::encode(hasher.finalize());

        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let id = FrameRef::build_id(&self.config.session_id, timestamp_ms, seq);

        let frames_dir = self.config.trace_dir.join("frames");
        tokio::fs::create_dir_all(&frames_dir).await?;
        let path = frames_dir.join(format!("{id}.jpg"));
        tokio::fs::write(&path, &raw).await?;

        let frame = FrameRef {
            id,
            session_id: self.config.session_id.0.clone(),
            timestamp: timestamp_ms.max(now_epoch_ms()).min(now_epoch_ms() + 1),
            width,
            height,
            mime: "image/jpeg".to_string(),
            checksum,
            storage_path: path.to_string_lossy().into_owned(),
            metadata: FrameMetadata {
                raw_byte_length: raw.len(),
                processing_ms: start.elapsed().as_millis() as u64,
                source_scale: 1.0,
            },
        };

        let mut ring = self.ring.lock().await;
        ring.push(frame);
        Ok(())
    }

    pub fn signal_visual_drift(&self) {
        if self.config.adaptive {
            self.burst_until_ms
                .store(now_epoch_ms() + BURST_DURATION_MS, Ordering::SeqCst);
        }
    }

    pub async fn stop(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Err(err) = self.driver.stop_screencast().await {
            debug!(?err, "best-effort screencast stop failed");
        }
        let mut ring = self.ring.lock().await;
        *ring = FrameRing::new(self.config.max_frames.max(1) as usize);
        self.pending_ack.store(0, Ordering::SeqCst);
    }

    pub async fn snapshot(&self) -> Vec<FrameRef> {
        self.ring.lock().await.snapshot()
    }

    pub async fn last_n(&self, n: usize) -> Vec<FrameRef> {
        self.ring.lock().await.last_n(n)
    }

    pub async fn queue_health(&self) -> QueueHealth {
        let ring = self.ring.lock().await;
        QueueHealth {
            frame_queue_depth: ring.depth(),
            frame_queue_max: ring.capacity(),
            frames_dropped: ring.dropped(),
            frames_pending_ack: self.pending_ack.load(Ordering::SeqCst),
        }
    }

    pub async fn latest_frame(&self) -> Option<FrameRef> {
        self.ring.lock().await.latest()
    }
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webagent_core_types::CaptureProfile;

    #[test]
    fn frame_cap_defaults_to_eight() {
        assert_eq!(resolve_frame_cap(CaptureProfile::Adaptive, None), 8);
    }

    #[test]
    fn frame_cap_clamps_for_non_frames_only() {
        assert_eq!(resolve_frame_cap(CaptureProfile::Adaptive, Some(1)), 3);
        assert_eq!(resolve_frame_cap(CaptureProfile::Adaptive, Some(64)), 12);
        assert_eq!(resolve_frame_cap(CaptureProfile::DomOnly, Some(9)), 9);
    }

    #[test]
    fn frame_cap_uses_full_clamp_for_frames_only() {
        assert_eq!(resolve_frame_cap(CaptureProfile::FramesOnly, Some(1)), 2);
        assert_eq!(resolve_frame_cap(CaptureProfile::FramesOnly, Some(64)), 20);
    }
}
