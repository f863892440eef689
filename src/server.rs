use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::{Settings, CSV_FILENAME, HTML_FILENAME, XLSX_FILENAME};
use crate::status::{read_status, StatusInfo};
use crate::view::{render_info, render_not_found, LandingView};
use crate::Result;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Clone)]
pub struct AppState {
    settings: Arc<Settings>,
    view: Arc<LandingView>,
}

impl AppState {
    pub fn new(settings: Arc<Settings>) -> Self {
        let view = Arc::new(LandingView::new(&settings));
        Self { settings, view }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(landing))
        .route("/artists.html", get(artists_html))
        .route("/artists.csv", get(artists_csv))
        .route("/artists.xlsx", get(artists_xlsx))
        .route("/info", get(info_json))
        .route("/info/html", get(info_html))
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves until `shutdown` flips to `true`.
pub async fn serve(listener: TcpListener, state: AppState, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
            info!("shutting down http server");
        })
        .await?;

    Ok(())
}

async fn landing(State(state): State<AppState>) -> Response {
    match state.view.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn artists_html(State(state): State<AppState>) -> Response {
    serve_file(state.settings.data_dir.join(HTML_FILENAME), "text/html; charset=utf-8").await
}

async fn artists_csv(State(state): State<AppState>) -> Response {
    serve_file(state.settings.data_dir.join(CSV_FILENAME), "text/csv; charset=utf-8").await
}

async fn artists_xlsx(State(state): State<AppState>) -> Response {
    serve_file(state.settings.data_dir.join(XLSX_FILENAME), XLSX_MIME).await
}

async fn serve_file(path: PathBuf, content_type: &'static str) -> Response {
    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type)], bytes).into_response(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => not_found().await,
        Err(e) => {
            error!("failed to read {}: {}", path.display(), e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn load_status(state: &AppState) -> Option<StatusInfo> {
    let data_dir = state.settings.data_dir.clone();
    match tokio::task::spawn_blocking(move || read_status(&data_dir)).await {
        Ok(status) => status,
        Err(e) => {
            error!("status read task failed: {}", e);
            None
        }
    }
}

async fn info_json(State(state): State<AppState>) -> Response {
    match load_status(&state).await {
        Some(status) => Json(status).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "Info not available" }))).into_response(),
    }
}

async fn info_html(State(state): State<AppState>) -> Response {
    let Some(status) = load_status(&state).await else {
        return (StatusCode::NOT_FOUND, Html("<p>Status info not available.</p>")).into_response();
    };

    match render_info(&status) {
        Ok(html) => Html(html).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn not_found() -> Response {
    match render_not_found() {
        Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
        Err(e) => internal_error(e),
    }
}

fn internal_error(e: crate::Error) -> Response {
    error!("failed to render page: {}", e);
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}
