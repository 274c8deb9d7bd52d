//! Canned HTTP server standing in for PDF hosts and the storage endpoint

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;

/// How long `/slow.pdf` stalls before answering
pub const SLOW_DELAY: Duration = Duration::from_secs(10);

struct ServerState {
    pdf: Vec<u8>,
    saved: Mutex<Vec<Value>>,
}

pub struct TestServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
}

impl TestServer {
    /// Serve `pdf` on an ephemeral local port
    pub async fn start(pdf: Vec<u8>) -> Self {
        let state = Arc::new(ServerState {
            pdf,
            saved: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/docs/sample.pdf", get(serve_pdf))
            .route("/slow.pdf", get(serve_pdf_slowly))
            .route("/page.html", get(serve_html))
            .route("/missing.pdf", get(not_found))
            .route("/api/save", post(accept_save))
            .route("/api/reject", post(reject_save))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Bodies received on `/api/save`, in arrival order
    pub fn saved(&self) -> Vec<Value> {
        self.state.saved.lock().unwrap().clone()
    }
}

async fn serve_pdf(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/pdf")], state.pdf.clone())
}

async fn serve_pdf_slowly(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    tokio::time::sleep(SLOW_DELAY).await;
    ([(header::CONTENT_TYPE, "application/pdf")], state.pdf.clone())
}

async fn serve_html() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        "<html><body>not a pdf</body></html>",
    )
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "no such document")
}

async fn accept_save(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.saved.lock().unwrap().push(body);
    StatusCode::CREATED
}

async fn reject_save() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "storage unavailable")
}
