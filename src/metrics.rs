//! Process-wide Prometheus registry. Each crate that owns gauges/counters
//! registers its own metrics here once; `/metrics` gathers and encodes the
//! single shared registry.

use once_cell::sync::{Lazy, OnceCell};
use prometheus::Registry;
use tracing::error;

static GLOBAL_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);
static REGISTER_ONCE: OnceCell<()> = OnceCell::new();

pub fn global_registry() -> &'static Registry {
    &GLOBAL_REGISTRY
}

pub fn register_metrics() {
    REGISTER_ONCE.get_or_init(|| {
        let registry = global_registry();
        if let Err(err) = session_runtime::metrics::register(registry) {
            error!(%err, "failed to register session-runtime metrics");
        }
    });
}
