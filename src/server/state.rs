use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use session_runtime::SessionManager;

use crate::config::Config;

/// Shared axum handler state: the session manager plus readiness/liveness
/// flags the background tasks flip as the process comes up and stays up.
#[derive(Clone)]
pub struct ServeState {
    pub config: Arc<Config>,
    pub manager: Arc<SessionManager>,
    health: Arc<ServeHealth>,
}

#[derive(Default)]
pub struct ServeHealth {
    live: AtomicBool,
    ready: AtomicBool,
}

impl ServeHealth {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            live: AtomicBool::new(true),
            ready: AtomicBool::new(false),
        })
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    pub fn mark_not_live(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

impl ServeState {
    pub fn new(config: Arc<Config>, manager: Arc<SessionManager>, health: Arc<ServeHealth>) -> Self {
        Self { config, manager, health }
    }

    pub fn health(&self) -> &Arc<ServeHealth> {
        &self.health
    }
}
