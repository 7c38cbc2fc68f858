//! chatterd - realtime presence, fan-out and signaling daemon.

use chatterd::config::Config;
use chatterd::http::{self, ApiState};
use chatterd::network::Gateway;
use chatterd::router::EventRouter;
use chatterd::state::Hub;
use chatterd::tasks::{DailyCheck, RunLog, ScheduledNotices, spawn_daily_checks};
use chatterd::{metrics, telemetry};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(
        server = %config.server.name,
        node_id = %config.server.node_id,
        "Starting chatterd"
    );

    metrics::init();

    let hub = Arc::new(Hub::new(&config.server.node_id, config.limits.sendq));
    let router = EventRouter::new(Arc::clone(&hub));
    let shutdown = CancellationToken::new();

    // Convention: metrics_port unset or 0 leaves /metrics to the internal API.
    match config.server.metrics_port {
        Some(port) if port != 0 => {
            tokio::spawn(http::run_metrics_server(port));
            info!(port, "Prometheus HTTP server started");
        }
        _ => info!("Dedicated Prometheus listener disabled"),
    }

    if let Some(http_cfg) = &config.http {
        let listener = TcpListener::bind(http_cfg.address).await?;
        let state = ApiState::new(router.clone(), http_cfg.internal_token.clone());
        let api_shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = http::serve(listener, state, api_shutdown).await {
                error!(error = %e, "Internal HTTP API error");
            }
        });
    }

    let checks: Vec<Arc<dyn DailyCheck>> =
        vec![Arc::new(ScheduledNotices::from_config(&config.schedule))];
    let daily = spawn_daily_checks(
        router.clone(),
        checks,
        Duration::from_secs(config.schedule.interval_secs),
        RunLog::from_config(&config.schedule).await,
        shutdown.clone(),
    );

    let gateway = Gateway::bind(&config, router).await?;
    info!(address = %gateway.local_addr()?, "chatterd ready");

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        info!("Shutdown signal received");
        signal_shutdown.cancel();
    });

    gateway.run(shutdown.clone()).await?;

    if let Err(e) = daily.await {
        error!(error = %e, "Daily check task ended abnormally");
    }
    // Let connection tasks observe the shutdown and close their sockets.
    tokio::time::sleep(Duration::from_millis(200)).await;
    info!(connections = hub.connection_count(), "chatterd stopped");
    Ok(())
}
