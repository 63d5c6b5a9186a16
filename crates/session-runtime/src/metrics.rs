use lazy_static::lazy_static;
use prometheus::{IntCounterVec, IntGauge, Opts, Registry};

lazy_static! {
    pub static ref SESSIONS_ACTIVE: IntGauge = IntGauge::new(
        "webagent_sessions_active",
        "Number of sessions currently admitted"
    )
    .expect("metric can be created");
    pub static ref SESSIONS_EVICTED: IntCounterVec = IntCounterVec::new(
        Opts::new("webagent_sessions_evicted_total", "Sessions evicted by the manager"),
        &["reason"]
    )
    .expect("metric can be created");
    pub static ref STEPS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("webagent_steps_total", "Steps executed, by outcome"),
        &["outcome"]
    )
    .expect("metric can be created");
}

/// Registers this crate's metrics against `registry`; idempotent-by-construction
/// since the caller owns a single process-wide registry built once at startup.
pub fn register(registry: &Registry) -> Result<(), prometheus::Error> {
    registry.register(Box::new(SESSIONS_ACTIVE.clone()))?;
    registry.register(Box::new(SESSIONS_EVICTED.clone()))?;
    registry.register(Box::new(STEPS_TOTAL.clone()))?;
    Ok(())
}
