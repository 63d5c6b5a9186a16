//! Browser driver: the Chrome DevTools Protocol seam the rest of the session
//! runtime is built against. Everything above this crate talks to the [`Driver`]
//! trait, never to chromiumoxide directly.

pub mod chromium;
pub mod config;
pub mod driver;
pub mod error;
pub mod stub;

pub use chromium::ChromiumDriver;
pub use config::{detect_chrome_executable, DriverConfig};
pub use driver::{Driver, NetworkEventKind, RawFrameEvent, RawNetworkEvent};
pub use error::DriverError;
pub use stub::StubDriver;

pub(crate) fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
