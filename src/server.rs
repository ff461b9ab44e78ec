//! HTTP surface: banner, health probe, on-demand poll.

use std::sync::Arc;

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use serde::Serialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::pipeline::{CycleOutcome, CycleReport, PollCycle};

const BANNER: &str = concat!("sl-alert-relay ", env!("CARGO_PKG_VERSION"), " is running");

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub cycle: Arc<PollCycle>,
}

/// Build the router with the banner, health and check routes.
pub fn routes(cycle: Arc<PollCycle>) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .route("/check", get(check))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { cycle })
}

async fn banner() -> &'static str {
    BANNER
}

async fn health() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

#[derive(Serialize)]
struct CheckRan {
    ok: bool,
    ran: bool,
    #[serde(flatten)]
    report: CycleReport,
}

// The cycle runs on its own task so a dropped request cannot abandon it
// between send and record. A failed cycle still answers 200 with the reason.
async fn check(State(state): State<AppState>) -> impl IntoResponse {
    info!("On-demand poll requested");
    let cycle = Arc::clone(&state.cycle);
    let outcome = tokio::spawn(async move { cycle.trigger().await })
        .await
        .unwrap_or_else(|e| CycleOutcome::Failed(format!("Poll cycle task ended abnormally: {e}")));

    match outcome {
        CycleOutcome::Ran(report) => Json(json!(CheckRan {
            ok: true,
            ran: true,
            report,
        })),
        CycleOutcome::Skipped => Json(json!({ "ok": true, "skipped": true })),
        CycleOutcome::Failed(error) => Json(json!({ "ok": false, "error": error })),
    }
}
