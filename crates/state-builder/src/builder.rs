use tokio::sync::Mutex;
use tracing::debug;

use browser_driver::Driver;
use capture_coordinator::{CaptureCoordinator, QueueHealth};
use webagent_core_types::{now_epoch_ms, NetworkRing};

use crate::dom::{parse_dom_summary, synthesize_regions, DOM_SUMMARY_SCRIPT};
use crate::token::{compute_state_token, next_change_tokens};
use crate::types::{IncludeFlags, StatePacket};

const DEFAULT_NETWORK_SAMPLE: usize = 100;
const DEFAULT_FRAME_SAMPLE: u32 = 6;

/// Merges DOM, accessibility, network and frame observations into a
/// [`StatePacket`] and tracks the change token across calls. One builder is
/// owned per session; there is no cross-session token sharing.
pub struct StateBuilder {
    last_token: Mutex<Option<String>>,
}

impl Default for StateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StateBuilder {
    pub fn new() -> Self {
        Self {
            last_token: Mutex::new(None),
        }
    }

    pub async fn build(
        &self,
        driver: &dyn Driver,
        session_id: &str,
        include: IncludeFlags,
        network_ring: &NetworkRing,
        capture: Option<&CaptureCoordinator>,
        max_frames: Option<u32>,
    ) -> StatePacket {
        let url = driver.current_url().await.unwrap_or_default();
        let title = match driver.title().await {
            Ok(t) => t,
            Err(_) => String::new(),
        };

        let dom = if include.dom {
            match driver.evaluate(DOM_SUMMARY_SCRIPT).await {
                Ok(value) => Some(parse_dom_summary(&value)),
                Err(err) => {
                    debug!(%err, "dom summary evaluation failed");
                    None
                }
            }
        } else {
            None
        };

        let accessibility = if include.accessibility {
            driver.accessibility_snapshot().await.ok()
        } else {
            None
        };

        let network_events = if include.network {
            network_ring.last_n(DEFAULT_NETWORK_SAMPLE)
        } else {
            Vec::new()
        };

        let frame_refs = if include.frame {
            match capture {
                Some(coordinator) => {
                    let n = max_frames.unwrap_or(DEFAULT_FRAME_SAMPLE).max(1) as usize;
                    coordinator.last_n(n).await
                }
                None => Vec::new(),
            }
        } else {
            Vec::new()
        };

        let region_detections = dom.as_ref().map(synthesize_regions);

        let token = compute_state_token(&url, &title, dom.as_ref(), network_events.len(), frame_refs.len());

        let change_tokens = {
            let mut last = self.last_token.lock().await;
            let tokens = next_change_tokens(last.as_deref(), &token);
            *last = Some(token.clone());
            tokens
        };

        let queue_health = match capture {
            Some(coordinator) => coordinator.queue_health().await,
            None => QueueHealth::default(),
        };

        StatePacket {
            state_token: token,
            timestamp: now_epoch_ms(),
            session_id: session_id.to_string(),
            url,
            title,
            dom,
            accessibility,
            network_events,
            frame_refs,
            region_detections,
            change_tokens,
            queue_health,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use browser_driver::StubDriver;

    #[tokio::test]
    async fn builds_packet_with_all_observations() {
        let driver = StubDriver::new("https://example.com");
        let builder = StateBuilder::new();
        let ring = NetworkRing::new(500);

        let packet = builder
            .build(
                &driver,
                "s1",
                IncludeFlags {
                    dom: true,
                    accessibility: true,
                    network: true,
                    frame: true,
                },
                &ring,
                None,
                None,
            )
            .await;

        assert_eq!(packet.url, "https://example.com");
        assert!(packet.dom.is_some());
        assert!(packet.accessibility.is_some());
        assert_eq!(packet.change_tokens, vec!["INIT".to_string()]);
    }

    #[tokio::test]
    async fn s7_change_tokens_follow_init_no_change_changed() {
        let driver = StubDriver::new("https://example.com");
        let builder = StateBuilder::new();
        let ring = NetworkRing::new(500);
        let flags = IncludeFlags { dom: false, accessibility: false, network: false, frame: false };

        let first = builder.build(&driver, "s1", flags, &ring, None, None).await;
        assert_eq!(first.change_tokens, vec!["INIT".to_string()]);

        let second = builder.build(&driver, "s1", flags, &ring, None, None).await;
        assert_eq!(second.change_tokens, vec!["NO_CHANGE".to_string()]);

        driver.set_url("https://example.com/other");
        let third = builder.build(&driver, "s1", flags, &ring, None, None).await;
        assert_eq!(third.change_tokens, vec!["STATE_CHANGED".to_string()]);
    }

    #[tokio::test]
    async fn excluding_observations_omits_them() {
        let driver = StubDriver::new("https://example.com");
        let builder = StateBuilder::new();
        let ring = NetworkRing::new(500);
        let flags = IncludeFlags::default();

        let packet = builder.build(&driver, "s1", flags, &ring, None, None).await;
        assert!(packet.dom.is_none());
        assert!(packet.accessibility.is_none());
        assert!(packet.network_events.is_empty());
        assert!(packet.frame_refs.is_empty());
        assert!(packet.region_detections.is_none());
    }
}
