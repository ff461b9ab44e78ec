use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::Context;
use tracing::{error, info};

use sl_alert_relay::config::NotifierConfig;
use sl_alert_relay::pipeline::{PollCycle, spawn_poller};
use sl_alert_relay::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = NotifierConfig::from_env().unwrap_or_else(|e| {
        error!(error = %e, "Cannot start without Telegram credentials");
        eprintln!("Error: {e}");
        eprintln!("  export TELEGRAM_BOT_TOKEN=... TELEGRAM_CHAT_ID=...");
        std::process::exit(1);
    });

    eprintln!("🚇 SL alert relay v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Mode: {} lines {:?}", config.cycle.transport_mode, config.cycle.lines);
    eprintln!("   Ledger: {}", config.state_db.display());

    // ── Poll cycle ──────────────────────────────────────────────────────
    let cycle = Arc::new(
        PollCycle::from_config(&config)
            .await
            .with_context(|| format!("starting with ledger at {}", config.state_db.display()))?,
    );

    // ── Timer ───────────────────────────────────────────────────────────
    let poller = match config.poll_interval {
        Some(interval) => {
            eprintln!("   Polling every {}s", interval.as_secs());
            Some(spawn_poller(Arc::clone(&cycle), interval))
        }
        None => {
            eprintln!("   Polling: disabled (use /check)");
            None
        }
    };

    // ── HTTP ────────────────────────────────────────────────────────────
    let app = server::routes(Arc::clone(&cycle));
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("binding port {}", config.port))?;
    info!(port = config.port, "HTTP server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl-C");
            }
        })
        .await
        .context("HTTP server")?;

    if let Some((handle, shutdown)) = poller {
        shutdown.store(true, Ordering::Relaxed);
        handle.abort();
    }
    info!("Shut down");
    Ok(())
}
