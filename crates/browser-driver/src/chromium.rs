use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::accessibility::GetFullAxTreeParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
    DispatchMouseEventType, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventRequestWillBeSent, EventResponseReceived,
};
use chromiumoxide::cdp::browser_protocol::page::{
    ScreencastFrameAckParams, StartScreencastFormat, StartScreencastParams,
    StopScreencastParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::config::{detect_chrome_executable, DriverConfig};
use crate::driver::{Driver, NetworkEventKind, RawFrameEvent, RawNetworkEvent};
use crate::error::DriverError;

/// Hardened sandbox flags applied to every launch, independent of the caller's
/// headless/viewport choices. Disabling these subsystems shrinks the attack
/// surface and stops background chatter (update checks, sync, translate popups)
/// from polluting the network ring.
fn hardened_launch_args() -> Vec<&'static str> {
    vec![
        "--disable-background-networking",
        "--disable-background-timer-throttling",
        "--disable-backgrounding-occluded-windows",
        "--disable-breakpad",
        "--disable-client-side-phishing-detection",
        "--disable-component-update",
        "--disable-default-apps",
        "--disable-dev-shm-usage",
        "--disable-extensions",
        "--disable-features=Translate,BackForwardCache",
        "--disable-popup-blocking",
        "--disable-prompt-on-repost",
        "--disable-renderer-backgrounding",
        "--disable-sync",
        "--metrics-recording-only",
        "--no-first-run",
        "--no-default-browser-check",
        "--password-store=basic",
        "--use-mock-keychain",
    ]
}

/// A driver backed by a real, launched Chrome process reached over CDP.
pub struct ChromiumDriver {
    browser: Mutex<Browser>,
    page: Page,
    screencast_active: AtomicBool,
}

impl ChromiumDriver {
    pub async fn launch(config: &DriverConfig) -> Result<Self, DriverError> {
        let executable = detect_chrome_executable(config.executable.as_deref())
            .ok_or(DriverError::ExecutableNotFound)?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(executable)
            .args(hardened_launch_args());

        if config.headless {
            builder = builder.headless_mode(chromiumoxide::browser::HeadlessMode::New);
        } else {
            builder = builder.with_head();
        }

        if let Some((w, h)) = config.viewport {
            builder = builder.window_size(w, h);
        }

        if let Some(dir) = &config.user_data_dir {
            builder = builder.user_data_dir(dir);
        }

        let browser_config = builder
            .build()
            .map_err(|e| DriverError::Internal(format!("invalid browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| DriverError::CdpIo(e.to_string()))?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    warn!(?err, "chrome devtools protocol handler event error");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| DriverError::CdpIo(e.to_string()))?;

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            screencast_active: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl Driver for ChromiumDriver {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        tokio::time::timeout(timeout, async {
            self.page
                .goto(url)
                .await
                .map_err(|e| DriverError::CdpIo(e.to_string()))?;
            self.page
                .wait_for_navigation()
                .await
                .map_err(|e| DriverError::CdpIo(e.to_string()))?;
            Ok::<_, DriverError>(())
        })
        .await
        .map_err(|_| DriverError::NavTimeout(timeout.as_millis() as u64))?
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        self.page
            .url()
            .await
            .map_err(|e| DriverError::CdpIo(e.to_string()))?
            .ok_or_else(|| DriverError::Internal("page has no url".into()))
    }

    async fn title(&self) -> Result<String, DriverError> {
        match self.page.get_title().await {
            Ok(Some(title)) => Ok(title),
            Ok(None) => Ok(String::new()),
            Err(_) => Ok(String::new()),
        }
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, DriverError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| DriverError::CdpIo(e.to_string()))?;
        result
            .into_value::<serde_json::Value>()
            .map_err(|e| DriverError::Internal(format!("failed to decode eval result: {e}")))
    }

    async fn accessibility_snapshot(&self) -> Result<serde_json::Value, DriverError> {
        let nodes = self
            .page
            .execute(GetFullAxTreeParams::builder().build())
            .await
            .map_err(|e| DriverError::CdpIo(e.to_string()))?;
        serde_json::to_value(&nodes.result.nodes)
            .map_err(|e| DriverError::Internal(format!("failed to encode ax tree: {e}")))
    }

    async fn selector_count(&self, selector: &str) -> Result<usize, DriverError> {
        Ok(self
            .page
            .find_elements(selector)
            .await
            .map_err(|e| DriverError::CdpIo(e.to_string()))?
            .len())
    }

    async fn click_selector(&self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        tokio::time::timeout(timeout, async {
            let mut element = self
                .page
                .find_element(selector)
                .await
                .map_err(|_| DriverError::ElementNotFound(selector.to_string()))?;
            element
                .scroll_into_view()
                .await
                .map_err(|e| DriverError::CdpIo(e.to_string()))?;
            element
                .click()
                .await
                .map_err(|e| DriverError::CdpIo(e.to_string()))?;
            Ok::<_, DriverError>(())
        })
        .await
        .map_err(|_| DriverError::NavTimeout(timeout.as_millis() as u64))?
    }

    async fn click_coords(&self, x: f64, y: f64) -> Result<(), DriverError> {
        dispatch_mouse_click(&self.page, x, y).await
    }

    async fn hover_selector(&self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        tokio::time::timeout(timeout, async {
            let element = self
                .page
                .find_element(selector)
                .await
                .map_err(|_| DriverError::ElementNotFound(selector.to_string()))?;
            let pos = element
                .bounding_box()
                .await
                .map_err(|e| DriverError::CdpIo(e.to_string()))?;
            dispatch_mouse_move(&self.page, pos.x + pos.width / 2.0, pos.y + pos.height / 2.0)
                .await
        })
        .await
        .map_err(|_| DriverError::NavTimeout(timeout.as_millis() as u64))?
    }

    async fn hover_coords(&self, x: f64, y: f64) -> Result<(), DriverError> {
        dispatch_mouse_move(&self.page, x, y).await
    }

    async fn type_selector(
        &self,
        selector: &str,
        text: &str,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        tokio::time::timeout(timeout, async {
            let mut element = self
                .page
                .find_element(selector)
                .await
                .map_err(|_| DriverError::ElementNotFound(selector.to_string()))?;
            element
                .scroll_into_view()
                .await
                .map_err(|e| DriverError::CdpIo(e.to_string()))?;
            element
                .click()
                .await
                .map_err(|e| DriverError::CdpIo(e.to_string()))?;
            element
                .type_str(text)
                .await
                .map_err(|e| DriverError::CdpIo(e.to_string()))?;
            Ok::<_, DriverError>(())
        })
        .await
        .map_err(|_| DriverError::NavTimeout(timeout.as_millis() as u64))?
    }

    async fn type_coords(&self, x: f64, y: f64, text: &str) -> Result<(), DriverError> {
        dispatch_mouse_click(&self.page, x, y).await?;
        for ch in text.chars() {
            self.page
                .execute(
                    DispatchKeyEventParams::builder()
                        .r#type(DispatchKeyEventType::Char)
                        .text(ch.to_string())
                        .build()
                        .map_err(|e| DriverError::Internal(e.to_string()))?,
                )
                .await
                .map_err(|e| DriverError::CdpIo(e.to_string()))?;
        }
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), DriverError> {
        self.page
            .execute(
                DispatchKeyEventParams::builder()
                    .r#type(DispatchKeyEventType::KeyDown)
                    .key(key.to_string())
                    .build()
                    .map_err(|e| DriverError::Internal(e.to_string()))?,
            )
            .await
            .map_err(|e| DriverError::CdpIo(e.to_string()))?;
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.page
            .execute(
                DispatchKeyEventParams::builder()
                    .r#type(DispatchKeyEventType::KeyUp)
                    .key(key.to_string())
                    .build()
                    .map_err(|e| DriverError::Internal(e.to_string()))?,
            )
            .await
            .map_err(|e| DriverError::CdpIo(e.to_string()))?;
        Ok(())
    }

    async fn scroll(
        &self,
        move_to: Option<(f64, f64)>,
        delta_x: f64,
        delta_y: f64,
    ) -> Result<(), DriverError> {
        let (x, y) = move_to.unwrap_or((0.0, 0.0));
        self.page
            .execute(
                DispatchMouseEventParams::builder()
                    .r#type(DispatchMouseEventType::MouseWheel)
                    .x(x)
                    .y(y)
                    .delta_x(delta_x)
                    .delta_y(delta_y)
                    .build()
                    .map_err(|e| DriverError::Internal(e.to_string()))?,
            )
            .await
            .map_err(|e| DriverError::CdpIo(e.to_string()))?;
        Ok(())
    }

    async fn drag(&self, x: f64, y: f64, delta_x: f64, delta_y: f64) -> Result<(), DriverError> {
        dispatch_mouse_event(&self.page, DispatchMouseEventType::MousePressed, x, y).await?;
        const STEPS: i32 = 10;
        for step in 1..=STEPS {
            let t = step as f64 / STEPS as f64;
            dispatch_mouse_event(
                &self.page,
                DispatchMouseEventType::MouseMoved,
                x + delta_x * t,
                y + delta_y * t,
            )
            .await?;
        }
        dispatch_mouse_event(
            &self.page,
            DispatchMouseEventType::MouseReleased,
            x + delta_x,
            y + delta_y,
        )
        .await
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        tokio::time::timeout(timeout, async {
            loop {
                if self
                    .page
                    .find_element(selector)
                    .await
                    .is_ok()
                {
                    return Ok::<_, DriverError>(());
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await
        .map_err(|_| DriverError::NavTimeout(timeout.as_millis() as u64))?
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<(), DriverError> {
        tokio::time::timeout(timeout, self.page.wait_for_navigation())
            .await
            .map_err(|_| DriverError::NavTimeout(timeout.as_millis() as u64))?
            .map_err(|e| DriverError::CdpIo(e.to_string()))?;
        Ok(())
    }

    async fn wait_for_dom_stable(&self, timeout: Duration) -> Result<(), DriverError> {
        tokio::time::timeout(timeout, self.page.wait_for_navigation())
            .await
            .map_err(|_| DriverError::NavTimeout(timeout.as_millis() as u64))?
            .map_err(|e| DriverError::CdpIo(e.to_string()))?;
        Ok(())
    }

    async fn start_screencast(
        &self,
        quality: u32,
        max_width: u32,
        max_height: u32,
        sink: mpsc::UnboundedSender<RawFrameEvent>,
    ) -> Result<(), DriverError> {
        if self.screencast_active.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut events = self
            .page
            .event_listener::<chromiumoxide::cdp::browser_protocol::page::EventScreencastFrame>()
            .await
            .map_err(|e| DriverError::CdpIo(e.to_string()))?;

        self.page
            .execute(
                StartScreencastParams::builder()
                    .format(StartScreencastFormat::Jpeg)
                    .quality(quality as i64)
                    .max_width(max_width as i64)
                    .max_height(max_height as i64)
                    .every_nth_frame(1)
                    .build(),
            )
            .await
            .map_err(|e| DriverError::CdpIo(e.to_string()))?;

        let page = self.page.clone();
        tokio::spawn(async move {
            while let Some(frame) = events.next().await {
                let event = RawFrameEvent {
                    ack_session_id: Some(frame.session_id.to_string()),
                    data_base64: Some(frame.data.clone().into()),
                    timestamp_ms: (frame
                        .metadata
                        .timestamp
                        .as_ref()
                        .map(|t| *t.inner())
                        .unwrap_or(0.0)
                        * 1000.0) as u64,
                    device_width: frame.metadata.device_width as u32,
                    device_height: frame.metadata.device_height as u32,
                };
                if sink.send(event).is_err() {
                    break;
                }
                let _ = page
                    .execute(
                        ScreencastFrameAckParams::builder()
                            .session_id(frame.session_id)
                            .build()
                            .unwrap(),
                    )
                    .await;
            }
        });

        Ok(())
    }

    async fn ack_frame(&self, ack_session_id: &str) -> Result<(), DriverError> {
        let session_id = ack_session_id
            .parse::<i64>()
            .map_err(|e| DriverError::Internal(e.to_string()))?;
        let _ = self
            .page
            .execute(
                ScreencastFrameAckParams::builder()
                    .session_id(session_id)
                    .build()
                    .map_err(|e| DriverError::Internal(e.to_string()))?,
            )
            .await;
        Ok(())
    }

    async fn stop_screencast(&self) -> Result<(), DriverError> {
        if !self.screencast_active.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        let _ = self.page.execute(StopScreencastParams::default()).await;
        Ok(())
    }

    async fn subscribe_network(
        &self,
        sink: mpsc::UnboundedSender<RawNetworkEvent>,
    ) -> Result<(), DriverError> {
        let mut requests = self
            .page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(|e| DriverError::CdpIo(e.to_string()))?;
        let mut responses = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| DriverError::CdpIo(e.to_string()))?;
        let mut failures = self
            .page
            .event_listener::<EventLoadingFailed>()
            .await
            .map_err(|e| DriverError::CdpIo(e.to_string()))?;

        let req_sink = sink.clone();
        tokio::spawn(async move {
            while let Some(e) = requests.next().await {
                let _ = req_sink.send(RawNetworkEvent {
                    kind: NetworkEventKind::Request,
                    request_id: e.request_id.inner().to_string(),
                    url: e.request.url.clone(),
                    method: e.request.method.clone(),
                    status: None,
                    resource_type: Some(format!("{:?}", e.r#type)),
                    time_ms: (e.timestamp.inner() * 1000.0) as u64,
                    failure_text: None,
                });
            }
        });

        let resp_sink = sink.clone();
        tokio::spawn(async move {
            while let Some(e) = responses.next().await {
                let _ = resp_sink.send(RawNetworkEvent {
                    kind: NetworkEventKind::Response,
                    request_id: e.request_id.inner().to_string(),
                    url: e.response.url.clone(),
                    method: String::new(),
                    status: Some(e.response.status as u16),
                    resource_type: Some(format!("{:?}", e.r#type)),
                    time_ms: (e.timestamp.inner() * 1000.0) as u64,
                    failure_text: None,
                });
            }
        });

        tokio::spawn(async move {
            while let Some(e) = failures.next().await {
                let _ = sink.send(RawNetworkEvent {
                    kind: NetworkEventKind::Failure,
                    request_id: e.request_id.inner().to_string(),
                    url: String::new(),
                    method: String::new(),
                    status: None,
                    resource_type: Some(format!("{:?}", e.r#type)),
                    time_ms: (e.timestamp.inner() * 1000.0) as u64,
                    failure_text: Some(e.error_text.clone()),
                });
            }
        });

        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        if let Err(err) = self.page.clone().close().await {
            debug!(?err, "page close failed during teardown");
        }
        let mut browser = self.browser.lock().await;
        if let Err(err) = browser.close().await {
            debug!(?err, "browser close failed during teardown");
        }
        Ok(())
    }
}

async fn dispatch_mouse_click(page: &Page, x: f64, y: f64) -> Result<(), DriverError> {
    dispatch_mouse_event(page, DispatchMouseEventType::MouseMoved, x, y).await?;
    dispatch_mouse_event(page, DispatchMouseEventType::MousePressed, x, y).await?;
    dispatch_mouse_event(page, DispatchMouseEventType::MouseReleased, x, y).await
}

async fn dispatch_mouse_move(page: &Page, x: f64, y: f64) -> Result<(), DriverError> {
    dispatch_mouse_event(page, DispatchMouseEventType::MouseMoved, x, y).await
}

async fn dispatch_mouse_event(
    page: &Page,
    kind: DispatchMouseEventType,
    x: f64,
    y: f64,
) -> Result<(), DriverError> {
    page.execute(
        DispatchMouseEventParams::builder()
            .r#type(kind)
            .x(x)
            .y(y)
            .button(MouseButton::Left)
            .click_count(1)
            .build()
            .map_err(|e| DriverError::Internal(e.to_string()))?,
    )
    .await
    .map_err(|e| DriverError::CdpIo(e.to_string()))?;
    Ok(())
}

/// Shared handle used by the session runtime; cheap to clone since `Page` is
/// already reference-counted internally by chromiumoxide.
pub type SharedChromiumDriver = Arc<ChromiumDriver>;
