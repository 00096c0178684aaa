// Enrolment Health Analytics - Web Server
// JSON API over one computed snapshot, plus report downloads

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use enrolment_health::{
    load_csv, AggregateStats, AnalyticsConfig, AnalyticsSnapshot, Anomaly, MetricsRepository, MonthPoint,
    Recommendation, ReportKind, StateMetrics,
};

/// Default number of states in performer lists
const DEFAULT_PERFORMERS: usize = 5;

/// Shared application state. Immutable after startup, so no locking.
#[derive(Clone)]
struct AppState {
    repo: Arc<MetricsRepository>,
    snapshot: Arc<AnalyticsSnapshot>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn failure(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

#[derive(Deserialize)]
struct PerformerQuery {
    n: Option<usize>,
}

/// Time series response
#[derive(Serialize)]
struct TimeSeriesResponse {
    state: String,
    data: Vec<MonthPoint>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/states - All states, best health score first
async fn list_states(State(state): State<AppState>) -> Json<ApiResponse<Vec<StateMetrics>>> {
    Json(ApiResponse::ok(state.snapshot.metrics.clone()))
}

/// GET /api/states/:state - One state's metrics
async fn get_state(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.repo.find_state(&name) {
        Some(metrics) => Json(ApiResponse::ok(metrics.clone())).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<StateMetrics>::failure(format!("Unknown state: {}", name))),
        )
            .into_response(),
    }
}

/// GET /api/states/:state/timeseries - Month series (empty for unknown states)
async fn get_time_series(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<ApiResponse<TimeSeriesResponse>> {
    let data = state.repo.time_series(&name);
    Json(ApiResponse::ok(TimeSeriesResponse { state: name, data }))
}

/// GET /api/performers/top?n=5
async fn top_performers(
    State(state): State<AppState>,
    Query(query): Query<PerformerQuery>,
) -> Json<ApiResponse<Vec<StateMetrics>>> {
    let n = query.n.unwrap_or(DEFAULT_PERFORMERS);
    Json(ApiResponse::ok(state.snapshot.top_performers(n).to_vec()))
}

/// GET /api/performers/bottom?n=5 - Worst first
async fn bottom_performers(
    State(state): State<AppState>,
    Query(query): Query<PerformerQuery>,
) -> Json<ApiResponse<Vec<StateMetrics>>> {
    let n = query.n.unwrap_or(DEFAULT_PERFORMERS);
    let bottom = state.snapshot.bottom_performers(n).into_iter().cloned().collect();
    Json(ApiResponse::ok(bottom))
}

/// GET /api/stats - Headline numbers
async fn get_stats(State(state): State<AppState>) -> Json<ApiResponse<AggregateStats>> {
    Json(ApiResponse::ok(state.snapshot.stats.clone()))
}

/// GET /api/anomalies
async fn get_anomalies(State(state): State<AppState>) -> Json<ApiResponse<Vec<Anomaly>>> {
    Json(ApiResponse::ok(state.snapshot.anomalies.clone()))
}

/// GET /api/recommendations
async fn get_recommendations(State(state): State<AppState>) -> Json<ApiResponse<Vec<Recommendation>>> {
    Json(ApiResponse::ok(state.snapshot.recommendations.clone()))
}

/// GET /api/export/:report - Download a report rendered from the shared snapshot
async fn export_report(State(state): State<AppState>, Path(report): Path<String>) -> Response {
    let kind: ReportKind = match report.parse() {
        Ok(kind) => kind,
        Err(e) => {
            return (StatusCode::NOT_FOUND, Json(ApiResponse::<()>::failure(e.to_string()))).into_response();
        }
    };

    match kind.render(&state.snapshot) {
        Ok(body) => (
            [
                (header::CONTENT_TYPE, kind.content_type().to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", kind.file_name()),
                ),
            ],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(report = kind.file_name(), error = %e, "Export failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::failure(format!("Export failed: {}", e))),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("🌐 Enrolment Health Analytics - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let csv_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("ENROLMENT_CSV").ok())
        .context("Usage: enrolment-server <records.csv> (or set ENROLMENT_CSV)")?;

    let config = match std::env::var("ENROLMENT_CONFIG") {
        Ok(path) => AnalyticsConfig::from_file(path)?,
        Err(_) => AnalyticsConfig::default(),
    };

    let records = load_csv(std::path::Path::new(&csv_path))?;
    println!("✓ Loaded {} records from {}", records.len(), csv_path);

    let repo = MetricsRepository::with_config(records, config);
    let snapshot = AnalyticsSnapshot::capture(&repo);
    println!(
        "✓ {} states, {} anomalies, {} recommendations",
        snapshot.metrics.len(),
        snapshot.anomalies.len(),
        snapshot.recommendations.len()
    );

    // Create shared state
    let state = AppState {
        repo: Arc::new(repo),
        snapshot: Arc::new(snapshot),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/states", get(list_states))
        .route("/states/:state", get(get_state))
        .route("/states/:state/timeseries", get(get_time_series))
        .route("/performers/top", get(top_performers))
        .route("/performers/bottom", get(bottom_performers))
        .route("/stats", get(get_stats))
        .route("/anomalies", get(get_anomalies))
        .route("/recommendations", get(get_recommendations))
        .route("/export/:report", get(export_report))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    // Start server
    let addr = std::env::var("ENROLMENT_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/states", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
