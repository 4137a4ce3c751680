use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use adapters::api::{KdpApiClient, KdpApiConfig};
use adapters::http::{AppState, run_http_server};
use application::collector::{Collector, CollectorConfig};
use application::registry::SnapshotStore;
use application::scheduler::PollScheduler;
use infrastructure::config::ExporterConfig;
use infrastructure::constants::GRACEFUL_SHUTDOWN_TIMEOUT;
use infrastructure::logging::init_logging;
use ports::secondary::appliance_api::ApplianceApi;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::Cli;

/// Run the exporter startup sequence and block until shutdown.
pub async fn run(cli: &Cli) -> anyhow::Result<()> {
    // ── 1. Load config ──────────────────────────────────────────────
    let config = ExporterConfig::load(Path::new(&cli.config))?;

    // ── 2. Initialize logging ───────────────────────────────────────
    // CLI flags take precedence over config file
    let log_level = cli.log_level.unwrap_or(config.exporter.log_level);
    let log_format = cli.log_format.unwrap_or(config.exporter.log_format);
    init_logging(log_level, log_format);

    // Root span, so every log entry carries the service fields
    let _root_span = tracing::span!(
        tracing::Level::INFO,
        "service",
        service.name = "kdp-exporter",
        service.version = env!("CARGO_PKG_VERSION"),
    )
    .entered();

    info!(
        config_path = %cli.config,
        appliance_url = %config.appliance.url,
        client_id = config.appliance.client_id,
        poll_interval_secs = config.poll.interval_secs,
        log_level = log_level.as_str(),
        log_format = log_format.as_str(),
        "KDP exporter starting"
    );

    // ── 3. Build the appliance API client ───────────────────────────
    let client = KdpApiClient::new(KdpApiConfig {
        url: config.appliance.url.clone(),
        client_id: config.appliance.client_id,
        user_id: config.appliance.user_id,
        secret_key: config.appliance.secret_key.clone(),
        locale_id: config.appliance.locale_id,
    })
    .map_err(|e| anyhow::anyhow!("failed to build API client: {e}"))?;
    let api: Arc<dyn ApplianceApi> = Arc::new(client);

    // ── 4. Wire collector, store and scheduler ──────────────────────
    let store = Arc::new(SnapshotStore::new());
    let auth_ok = Arc::new(AtomicBool::new(true));

    let collector = Collector::new(
        Arc::clone(&api),
        Arc::clone(&store),
        CollectorConfig {
            request_timeout: config.poll.request_timeout(),
            cycle_deadline: config.poll.cycle_deadline(),
            max_concurrent_resources: config.poll.max_concurrent_resources,
        },
    );

    let cancel_token = shutdown_token();

    let scheduler = PollScheduler::new(
        collector,
        config.poll.interval(),
        Arc::clone(&auth_ok),
        cancel_token.clone(),
    );
    // The scheduler stops on its own when credentials are rejected;
    // the exposition server keeps serving the last snapshot so the
    // failure is visible through /readyz instead of a vanished target.
    let scheduler_handle = tokio::spawn(scheduler.run());

    // ── 5. Start the exposition server ──────────────────────────────
    let state = Arc::new(AppState::new(
        Arc::clone(&store),
        Arc::clone(&auth_ok),
        config.http.empty_scrape,
    ));
    let bind_address = config.http.bind_address.clone();
    let port = config.http.port;
    let http_shutdown = cancel_token.clone();
    let http_cancel = cancel_token.clone();
    let http_handle = tokio::spawn(async move {
        if let Err(e) = run_http_server(
            state,
            &bind_address,
            port,
            http_shutdown.cancelled_owned(),
        )
        .await
        {
            tracing::error!(error = %e, "exposition server failed");
            http_cancel.cancel();
        }
    });

    // ── 6. Block until shutdown, then drain ─────────────────────────
    cancel_token.cancelled().await;
    info!("shutting down");

    let _ = tokio::time::timeout(GRACEFUL_SHUTDOWN_TIMEOUT, scheduler_handle).await;
    let _ = tokio::time::timeout(GRACEFUL_SHUTDOWN_TIMEOUT, http_handle).await;

    info!("shutdown complete");
    Ok(())
}

/// Token cancelled by the first SIGINT or SIGTERM. The poll scheduler
/// and the exposition server each hold a clone and drain together when
/// it fires.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("shutdown signal received");
        trigger.cancel();
    });
    token
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "SIGTERM listener unavailable, watching Ctrl+C only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shutdown_token_starts_uncancelled() {
        let token = shutdown_token();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }
}
