//! Local stand-in for the sheet export, Discord and the Wayback Machine.

use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use zip::write::FileOptions;
use zip::ZipWriter;

use crate::config::HTML_FILENAME;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub body: String,
}

#[derive(Clone, Default)]
struct Shared {
    sheet_html: Arc<Mutex<String>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

pub struct StubServer {
    pub base: String,
    shared: Shared,
}

impl StubServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let shared = Shared::default();

        let app = Router::new().fallback(record).with_state(shared.clone());
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        Self { base, shared }
    }

    /// Html served as `Artists.html` inside the zip export.
    pub fn set_sheet(&self, html: &str) {
        *self.shared.sheet_html.lock().unwrap() = html.to_owned();
    }

    pub fn requests_to(&self, prefix: &str) -> Vec<Recorded> {
        self.shared
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path.starts_with(prefix))
            .cloned()
            .collect()
    }
}

async fn record(State(shared): State<Shared>, method: Method, uri: Uri, body: String) -> Response {
    let path = uri.path().to_owned();
    shared.requests.lock().unwrap().push(Recorded {
        method,
        path: path.clone(),
        query: uri.query().map(str::to_owned),
        body,
    });

    if path.contains("broken") {
        return StatusCode::BAD_GATEWAY.into_response();
    }

    match uri.query() {
        Some("format=zip") => {
            let html = shared.sheet_html.lock().unwrap().clone();
            zip_with(HTML_FILENAME, &html).into_response()
        }
        Some("format=xlsx") => b"xlsx".to_vec().into_response(),
        _ => StatusCode::OK.into_response(),
    }
}

fn zip_with(name: &str, contents: &str) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file(name, FileOptions::default()).unwrap();
    zip.write_all(contents.as_bytes()).unwrap();
    zip.finish().unwrap().into_inner()
}

/// Minimal `table.waffle` export: three header rows, then one row per artist.
pub fn sheet_html(artists: &[(&str, &str)]) -> String {
    let rows: String = artists
        .iter()
        .map(|(name, credit)| {
            format!(r#"<tr><th>n</th><td><a href="https://t/{name}">{name}</a></td><td>{credit}</td><td>Yes</td><td>Yes</td></tr>"#)
        })
        .collect();
    format!(r#"<table class="waffle"><tbody><tr><td>t</td></tr><tr><td>n</td></tr><tr><td>h</td></tr>{rows}</tbody></table>"#)
}
