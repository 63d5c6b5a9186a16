use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use browser_driver::DriverConfig;
use session_runtime::{ChromiumDriverFactory, SessionManager};
use webagent_policy::UrlPolicy;
use webagent_runtime::config::{Config, Transport};
use webagent_runtime::server::{self, ServeHealth, ServeState};
use webagent_runtime::{metrics, stdio};

const GC_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(name = "webagentd", about = "Deterministic browser-control session runtime")]
struct Cli {
    /// Path to an optional config file (TOML/JSON/YAML); env vars always win.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Arc::new(Config::load(cli.config.as_ref()));
    init_tracing(&config);
    info!(config = %config.redacted_summary(), "starting webagentd");

    let url_policy = UrlPolicy::new(config.allowlist.clone(), config.denylist.clone());
    let driver_config = DriverConfig {
        executable: config.chrome_executable.clone(),
        headless: config.headless,
        user_data_dir: None,
        viewport: None,
        navigation_timeout_ms: 120_000,
    };
    let driver_factory = Arc::new(ChromiumDriverFactory::new(driver_config));
    let replay_store = Arc::new(replay_store::ReplayStore::new(config.traces_root.clone()));

    let manager = Arc::new(SessionManager::new(
        driver_factory,
        replay_store,
        url_policy,
        config.max_sessions,
        config.session_max_age_ms,
        config.traces_root.clone(),
    ));

    let health = ServeHealth::new();
    health.mark_ready();

    let gc_manager = Arc::clone(&manager);
    let gc_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(GC_INTERVAL);
        loop {
            interval.tick().await;
            let evicted = gc_manager.gc().await;
            if evicted > 0 {
                info!(evicted, "garbage-collected idle sessions");
            }
        }
    });

    let server_task = if matches!(config.transport, Transport::Rest) {
        let state = ServeState::new(Arc::clone(&config), Arc::clone(&manager), Arc::clone(&health));
        let router = server::build_router(state);
        let addr = format!("{}:{}", config.http_host, config.http_port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(%addr, "REST transport listening");
        Some(tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, router).await {
                error!(%err, "axum server exited with an error");
            }
        }))
    } else {
        None
    };

    let stdio_manager = Arc::clone(&manager);
    let stdio_task = tokio::spawn(async move {
        if let Err(err) = stdio::run(stdio_manager).await {
            error!(%err, "stdio dispatch loop exited with an error");
        }
    });

    wait_for_shutdown_signal().await;
    health.mark_not_live();
    info!("shutdown signal received, draining sessions");

    gc_task.abort();
    stdio_task.abort();
    if let Some(task) = server_task {
        task.abort();
    }

    drain_sessions(&manager).await;
    Ok(())
}

async fn drain_sessions(manager: &Arc<SessionManager>) {
    let ids: Vec<_> = manager.session_ids();
    for id in ids {
        if manager.stop(&id, true).await.is_none() {
            warn!(session_id = %id.0, "session vanished before shutdown drain could stop it");
        }
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("install SIGINT handler");
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.log_format == "json" {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };
    if let Err(err) = result {
        eprintln!("failed to install tracing subscriber: {err}");
    }
}
