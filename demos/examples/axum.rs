//! Axum Integration Example
//!
//! Serves an expensive-to-build report that is recomputed at most once every
//! 10 seconds. Stale-while-refresh is enabled, so while one request rebuilds
//! the report every other request gets the previous one without waiting.
//!
//! Run:
//!   cargo run -p refresher-demos --example axum
//!
//! Endpoints:
//!   - http://localhost:3000/report   - The refreshed report
//!   - http://localhost:3000/health   - Health check (not cached)
//!
//! Try it:
//!   curl -v http://localhost:3000/report   # First call blocks ~500ms
//!   curl -v http://localhost:3000/report   # Served from the snapshot
//!   sleep 11; curl -v http://localhost:3000/report

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use refresher::{BoxCompute, Refresher, RefresherConfig};
use serde::Serialize;

const CONFIG: &str = r#"
label: report
max_age: 10s
policy: StaleWhileRefresh
"#;

#[derive(Debug, Clone, Serialize)]
struct Report {
    generation: u64,
    generated_at: DateTime<Utc>,
    rows: Vec<u64>,
}

type ReportRefresher = Refresher<Arc<Report>, String, BoxCompute<Arc<Report>, String>>;

#[derive(Clone)]
struct AppState {
    report: Arc<ReportRefresher>,
}

/// Pretends to aggregate a lot of data.
fn build_report(generation: &AtomicU64) -> Result<Arc<Report>, String> {
    thread::sleep(Duration::from_millis(500));
    let generation = generation.fetch_add(1, Ordering::Relaxed) + 1;
    if generation % 5 == 0 {
        return Err(format!("generation {generation} failed, upstream unavailable"));
    }
    Ok(Arc::new(Report {
        generation,
        generated_at: Utc::now(),
        rows: (0..10).map(|i| i * generation).collect(),
    }))
}

async fn report(State(state): State<AppState>) -> Response {
    // `load` may run the compute function, keep it off the async workers.
    let refresher = Arc::clone(&state.report);
    match tokio::task::spawn_blocking(move || refresher.load()).await {
        Ok(Ok(report)) => Json(report.as_ref().clone()).into_response(),
        Ok(Err(err)) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
        Err(join_error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("report task failed: {join_error}"),
        )
            .into_response(),
    }
}

async fn health() -> &'static str {
    "OK"
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("info,refresher=debug")
        .init();

    let config: RefresherConfig =
        serde_saphyr::from_str(CONFIG).expect("Failed to parse refresher config");

    let generation = AtomicU64::new(0);
    let compute: BoxCompute<Arc<Report>, String> = Box::new(move || build_report(&generation));
    let report_refresher =
        Refresher::from_config(&config, compute).expect("Invalid refresher config");

    let state = AppState {
        report: Arc::new(report_refresher),
    };

    let app = Router::new()
        .route("/report", get(report))
        .route("/health", get(health))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    tracing::info!("Listening on http://localhost:3000");
    axum::serve(listener, app).await.unwrap();
}
