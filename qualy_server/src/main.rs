use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json,
};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::Context;
use minisector::{render_svg, Comparison, ComparisonConfig, FileTraceSource, RenderOptions, TraceCache};

mod service;
mod types;

use service::{internal_error, run_comparison, ApiError, ComparisonService};
use types::{CompareRequest, CompareResponse, EventsResponse};

// ---------- Server state ----------

#[derive(Clone)]
struct AppState {
    service: Arc<ComparisonService>,
    log_samples: bool,
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

fn log_comparison(comparison: &Comparison) {
    let samples = &comparison.attribution.samples;
    let mean = if samples.is_empty() {
        0.0
    } else {
        samples.iter().map(|s| s.speed).sum::<f64>() / samples.len() as f64
    };
    let max = samples.iter().map(|s| s.speed).fold(0.0, f64::max);
    tracing::info!(
        "event={} segments={} samples={} mean_speed={:.1} max_speed={:.1} length={:.1}m",
        comparison.event,
        comparison.attribution.segment_count,
        samples.len(),
        mean,
        max,
        comparison.attribution.segment_length
    );
}

async fn respond(state: &AppState, req: CompareRequest) -> Result<CompareResponse, ApiError> {
    let comparison = run_comparison(state.service.clone(), req).await?;
    if state.log_samples {
        log_comparison(&comparison);
    }
    Ok(CompareResponse::new(comparison, now_ms()))
}

// ---------- Handlers ----------

async fn events(State(state): State<AppState>) -> Json<EventsResponse> {
    let config = state.service.config();
    Json(EventsResponse::new(
        config.season,
        config.session.clone(),
        config.segments,
    ))
}

async fn compare_json(
    State(state): State<AppState>,
    Json(req): Json<CompareRequest>,
) -> Result<Json<CompareResponse>, ApiError> {
    respond(&state, req).await.map(Json)
}

async fn compare_svg(
    State(state): State<AppState>,
    Path((event, segments)): Path<(String, i64)>,
) -> Result<Response, ApiError> {
    let comparison = run_comparison(state.service.clone(), CompareRequest { event, segments }).await?;
    let svg = tokio::task::spawn_blocking(move || {
        render_svg(
            &comparison.attribution,
            &comparison.title(),
            &RenderOptions::default(),
        )
    })
    .await
    .map_err(|e| internal_error(e.to_string()))?
    .map_err(|e| internal_error(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
}

async fn invalidate_cache(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let removed = state
        .service
        .cache()
        .invalidate()
        .map_err(|e| internal_error(e.to_string()))?;
    Ok(Json(json!({ "removed": removed })))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

// Every text frame is one compare request; every reply one result or error.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    while let Some(msg) = receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!("websocket receive error: {}", e);
                break;
            }
        };

        let reply = match serde_json::from_str::<CompareRequest>(&text) {
            Ok(req) => match respond(&state, req).await {
                Ok(resp) => serde_json::to_string(&resp)
                    .unwrap_or_else(|e| json!({ "error": e.to_string() }).to_string()),
                Err((_, Json(body))) => body.to_string(),
            },
            Err(e) => json!({ "error": format!("invalid request: {}", e) }).to_string(),
        };

        if sender.send(Message::Text(reply)).await.is_err() {
            break;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let data_dir = std::env::var("DATA_DIR").context("DATA_DIR not set")?;
    let cache_dir = std::env::var("CACHE_DIR").unwrap_or_else(|_| "cache".to_string());
    let port: u16 = std::env::var("PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(8080);

    let config = match std::env::var("CONFIG_PATH") {
        Ok(path) => ComparisonConfig::load(&path)
            .with_context(|| format!("failed to load config {}", path))?,
        Err(_) => ComparisonConfig::default(),
    };
    let cache = TraceCache::init(&cache_dir)
        .with_context(|| format!("failed to initialise cache at {}", cache_dir))?;
    tracing::info!(
        "season {} session {} boundary {:?} segments {:?}",
        config.season,
        config.session,
        config.boundary,
        config.segments.values()
    );

    let state = AppState {
        service: Arc::new(ComparisonService::new(
            FileTraceSource::new(&data_dir, cache),
            config,
        )),
        log_samples: std::env::var("LOG_SAMPLES").ok().as_deref() == Some("1"),
    };

    let app = axum::Router::new()
        .route("/events", get(events))
        .route("/compare", post(compare_json))
        .route("/compare/:event/:segments/plot.svg", get(compare_svg))
        .route("/cache/invalidate", post(invalidate_cache))
        .route("/ws", get(ws_upgrade))
        .with_state(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
