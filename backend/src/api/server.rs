//! HTTP server for the migration chart API.
//!
//! # API Endpoints
//!
//! | Method | Path                 | Description                               |
//! |--------|----------------------|-------------------------------------------|
//! | GET    | `/health`            | Health check                              |
//! | POST   | `/api/upload`        | Upload a CSV export, returns full report  |
//! | GET    | `/api/totals`        | Yearly arrivals/departures/balance        |
//! | GET    | `/api/years`         | Years with data                           |
//! | GET    | `/api/top/{year}`    | Top-N arrivals and departures for a year  |
//! | GET    | `/api/dynamics`      | Peak-balance leaders and their series     |
//! | GET    | `/api/logs`          | SSE stream for real-time logs             |

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, Method},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::{cors::CorsLayer, services::ServeDir};

use super::state::AppState;
use super::types::{ApiResponse, DynamicsQuery, TopQuery, UploadQuery};
use crate::analysis::{AnalysisReport, Dynamics, MigrationView};
use crate::config::{EngineConfig, ServerConfig};
use crate::error::{ServerError, ServerResult};
use crate::logs::{log_error, log_info, log_success, LOG_BROADCASTER};
use crate::models::{TotalPoint, YearRankings};

/// Start the HTTP server
pub async fn start_server(config: ServerConfig) -> ServerResult<()> {
    config.validate()?;

    let state = AppState::new(EngineConfig::default());
    if let Some(path) = &config.data_file {
        log_info(format!("📂 Loading startup dataset {}", path.display()));
        let (dataset, _) = state.load_file(path).await?;
        log_success(format!(
            "Dataset '{}' ready ({} rows)",
            dataset.name, dataset.csv_info.row_count
        ));
    }

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    let mut router: Router<AppState> = Router::new()
        .route("/health", get(health))
        .route("/api/upload", post(upload_csv))
        .route("/api/totals", get(totals))
        .route("/api/years", get(years))
        .route("/api/top/{year}", get(top_for_year))
        .route("/api/dynamics", get(dynamics))
        .route("/api/logs", get(sse_logs));

    router = match &config.static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router.route("/", get(health)),
    };

    let app = router.with_state(state).layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    println!("🚀 Migrastat server running on http://localhost:{}", config.port);
    println!("   POST /api/upload       - Upload CSV file");
    println!("   GET  /api/totals       - Yearly totals");
    println!("   GET  /api/years        - Available years");
    println!("   GET  /api/top/{{year}}   - Top countries for a year");
    println!("   GET  /api/dynamics     - Largest balance swings");
    println!("   GET  /api/logs         - SSE log stream");
    println!("   GET  /health           - Health check");
    if let Some(dir) = &config.static_dir {
        println!();
        println!("📁 Serving static files from {}", dir.display());
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "migrastat",
        "version": env!("CARGO_PKG_VERSION"),
        "datasetLoaded": state.is_loaded().await,
        "endpoints": {
            "upload": "POST /api/upload",
            "totals": "GET /api/totals",
            "years": "GET /api/years",
            "top": "GET /api/top/{year}?n=",
            "dynamics": "GET /api/dynamics?k=",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // Lagged receivers drop the missed entries and keep streaming.
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload CSV endpoint; the upload replaces the current dataset.
async fn upload_csv(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> ServerResult<Json<ApiResponse<AnalysisReport>>> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(|s| s.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
            file_data = Some(bytes.to_vec());
        }
    }

    let bytes = file_data.ok_or_else(|| ServerError::BadRequest("No file provided".into()))?;
    let name = file_name.unwrap_or_else(|| "upload.csv".to_string());

    announce_upload(&name, bytes.len());

    let (dataset, output) = state
        .load_bytes(name, bytes, query.year)
        .await
        .map_err(|e| {
            log_error(format!("Upload failed: {}", e));
            e
        })?;

    Ok(Json(ApiResponse::new(&dataset, output.report)))
}

fn announce_upload(name: &str, size: usize) {
    log_info(format!("📄 New upload: {} ({} bytes)", name, size));
}

async fn totals(State(state): State<AppState>) -> ServerResult<Json<ApiResponse<Vec<TotalPoint>>>> {
    let dataset = state.current().await?;
    let engine = state.engine();
    let series = crate::analysis::total_series(&dataset.table, &engine);
    Ok(Json(ApiResponse::new(&dataset, series)))
}

async fn years(State(state): State<AppState>) -> ServerResult<Json<ApiResponse<Vec<i32>>>> {
    let dataset = state.current().await?;
    let engine = state.engine();
    let years = MigrationView::prepare(&dataset.table, &engine)
        .map(|view| view.years())
        .unwrap_or_default();
    Ok(Json(ApiResponse::new(&dataset, years)))
}

async fn top_for_year(
    State(state): State<AppState>,
    Path(year): Path<i32>,
    Query(query): Query<TopQuery>,
) -> ServerResult<Json<ApiResponse<YearRankings>>> {
    let dataset = state.current().await?;
    let mut engine = state.engine().as_ref().clone();
    if let Some(n) = query.n {
        engine = engine.with_top_n(n);
    }
    let rankings = crate::analysis::top_by_year(&dataset.table, &engine, year);
    Ok(Json(ApiResponse::new(&dataset, rankings)))
}

async fn dynamics(
    State(state): State<AppState>,
    Query(query): Query<DynamicsQuery>,
) -> ServerResult<Json<ApiResponse<Dynamics>>> {
    let dataset = state.current().await?;
    let engine = state.engine();
    let k = query.k.unwrap_or(engine.top_k);

    let result = match MigrationView::prepare(&dataset.table, &engine) {
        Some(view) => {
            let leaders = view.top_by_peak_balance(k);
            let series = view.balance_series(&leaders);
            Dynamics { leaders, series }
        }
        None => Dynamics {
            leaders: Vec::new(),
            series: Vec::new(),
        },
    };
    Ok(Json(ApiResponse::new(&dataset, result)))
}
