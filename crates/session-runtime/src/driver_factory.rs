use std::sync::Arc;

use async_trait::async_trait;
use browser_driver::{ChromiumDriver, Driver, DriverConfig, DriverError, StubDriver};

/// Seam that lets [`crate::manager::SessionManager`] launch a real browser in
/// production and a [`StubDriver`] in tests without the rest of the runtime
/// knowing which one it got.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn launch(&self, viewport: Option<(u32, u32)>) -> Result<Arc<dyn Driver>, DriverError>;
}

pub struct ChromiumDriverFactory {
    pub config: DriverConfig,
}

impl ChromiumDriverFactory {
    pub fn new(config: DriverConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DriverFactory for ChromiumDriverFactory {
    async fn launch(&self, viewport: Option<(u32, u32)>) -> Result<Arc<dyn Driver>, DriverError> {
        let mut config = self.config.clone();
        if viewport.is_some() {
            config.viewport = viewport;
        }
        let driver = ChromiumDriver::launch(&config).await?;
        Ok(Arc::new(driver) as Arc<dyn Driver>)
    }
}

/// Hands out a fresh [`StubDriver`] rooted at `about:blank`, ignoring the
/// requested viewport — the stub tracks no rendering state.
#[derive(Default)]
pub struct StubDriverFactory;

#[async_trait]
impl DriverFactory for StubDriverFactory {
    async fn launch(&self, _viewport: Option<(u32, u32)>) -> Result<Arc<dyn Driver>, DriverError> {
        Ok(Arc::new(StubDriver::new("about:blank")) as Arc<dyn Driver>)
    }
}
