// Tariff Watch - API Server
// JSON endpoints for overlays, AD/CVD orders, compliance and change history

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{Duration, NaiveDate, Utc};
use clap::Parser;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use tariff_watch::{
    compliance_report, compute_overlay, current_rates, lookup_adcvd, open_database,
    recent_changes, AppConfig, ConfigError, NormalizedCode, Origin,
};

const DEFAULT_CHANGES_LIMIT: usize = 200;
const DEFAULT_CHANGES_DAYS: i64 = 30;

#[derive(Parser)]
#[command(name = "tariff-server")]
struct Args {
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[arg(long, default_value = "0.0.0.0:3000")]
    addr: String,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
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

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Response {
        (
            StatusCode::OK,
            Json(Self {
                success: true,
                data: Some(data),
                error: None,
            }),
        )
            .into_response()
    }

    fn fail(status: StatusCode, message: impl Into<String>) -> Response {
        (
            status,
            Json(Self {
                success: false,
                data: None,
                error: Some(message.into()),
            }),
        )
            .into_response()
    }
}

/// Run a query against the shared connection, mapping failures to a 500
fn with_db<T, F>(state: &AppState, what: &str, query: F) -> Response
where
    T: Serialize,
    F: FnOnce(&Connection) -> Result<T>,
{
    let conn = match state.db.lock() {
        Ok(conn) => conn,
        Err(_) => {
            return ApiResponse::<T>::fail(StatusCode::INTERNAL_SERVER_ERROR, "database lock poisoned")
        }
    };
    match query(&conn) {
        Ok(data) => ApiResponse::ok(data),
        Err(e) => {
            error!(error = %e, "{} failed", what);
            ApiResponse::<T>::fail(StatusCode::INTERNAL_SERVER_ERROR, format!("{} failed", what))
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

#[derive(Deserialize)]
struct OriginQuery {
    origin: Option<String>,
}

#[derive(Deserialize)]
struct OverlayQuery {
    origin: Option<String>,
    base: Option<f64>,
}

#[derive(Deserialize)]
struct ChangesQuery {
    since: Option<String>,
    prefix: Option<String>,
    limit: Option<usize>,
}

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    ApiResponse::ok("OK")
}

/// GET /api/overlay/:code?origin=&base=
async fn get_overlay(Path(code): Path<String>, Query(q): Query<OverlayQuery>) -> Response {
    let origin = q.origin.unwrap_or_else(|| "CN".to_string());
    ApiResponse::ok(compute_overlay(&code, &origin, q.base.unwrap_or(0.0)))
}

/// GET /api/adcvd/:code?origin=
async fn get_adcvd(Path(code): Path<String>, Query(q): Query<OriginQuery>) -> Response {
    let origin = Origin::new(q.origin.as_deref().unwrap_or("CN"));
    match NormalizedCode::parse(&code) {
        Some(code) => ApiResponse::ok(lookup_adcvd(&code, &origin)),
        None => ApiResponse::<()>::fail(StatusCode::BAD_REQUEST, "invalid HTS code"),
    }
}

/// GET /api/compliance/:code?origin=
async fn get_compliance(Path(code): Path<String>, Query(q): Query<OriginQuery>) -> Response {
    let origin = Origin::new(q.origin.as_deref().unwrap_or("CN"));
    ApiResponse::ok(compliance_report(&code, &origin))
}

/// GET /api/changes?since=YYYY-MM-DD&prefix=&limit=
async fn get_changes(State(state): State<AppState>, Query(q): Query<ChangesQuery>) -> Response {
    let since = match q.since.as_deref() {
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()),
            Err(_) => None,
        },
        None => Some(Utc::now() - Duration::days(DEFAULT_CHANGES_DAYS)),
    };
    let since = match since {
        Some(since) => since,
        None => return ApiResponse::<()>::fail(StatusCode::BAD_REQUEST, "since must be YYYY-MM-DD"),
    };
    let limit = q.limit.unwrap_or(DEFAULT_CHANGES_LIMIT);

    with_db(&state, "changes query", |conn| {
        recent_changes(conn, since, q.prefix.as_deref(), limit)
    })
}

/// GET /api/rates/:prefix - Latest stored rows under a code prefix
async fn get_rates(State(state): State<AppState>, Path(prefix): Path<String>) -> Response {
    with_db(&state, "rates query", |conn| current_rates(conn, &prefix))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (config, missing) = match AppConfig::load(&args.config) {
        Ok(config) => (config, false),
        Err(ConfigError::NotFound(_)) => (AppConfig::default(), true),
        Err(e) => return Err(e.into()),
    };

    tracing_subscriber::fmt()
        .with_max_level(config.log_level())
        .init();

    if missing {
        warn!(path = %args.config.display(), "config file not found; using defaults");
    }

    let conn = open_database(&config.storage.database_path)?;
    info!(path = %config.storage.database_path.display(), "database opened");

    // Create shared state
    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/overlay/:code", get(get_overlay))
        .route("/adcvd/:code", get(get_adcvd))
        .route("/compliance/:code", get(get_compliance))
        .route("/changes", get(get_changes))
        .route("/rates/:prefix", get(get_rates))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", args.addr))?;

    info!(addr = %args.addr, "tariff-server listening");

    axum::serve(listener, app)
        .await
        .context("Server error")?;
    Ok(())
}
