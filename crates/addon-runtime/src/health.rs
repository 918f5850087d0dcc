//! Health endpoints.
//!
//! Report `UP` once the process has started; they say nothing about
//! reconciliation health.

use std::future::Future;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

pub fn router() -> Router {
    Router::new()
        .route("/healthz", get(liveness))
        .route("/healthz/liveness", get(liveness))
        .route("/healthz/readiness", get(readiness))
        .fallback(not_found)
        .layer(CorsLayer::permissive())
}

async fn liveness() -> impl IntoResponse {
    Json(json!({ "status": "UP" }))
}

async fn readiness() -> impl IntoResponse {
    Json(json!({ "status": "UP" }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "invalid request - route not found" })),
    )
}

/// Serve until `shutdown` completes, then finish in-flight requests.
pub async fn serve<F>(listener: TcpListener, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router())
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    async fn spawn_server() -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<std::io::Result<()>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(serve(listener, async move {
            let _ = rx.await;
        }));

        (format!("http://{addr}"), tx, handle)
    }

    #[tokio::test]
    async fn test_health_routes_report_up() {
        let (base, stop, handle) = spawn_server().await;
        let http = reqwest::Client::new();

        for path in ["/healthz", "/healthz/liveness", "/healthz/readiness"] {
            let resp = http.get(format!("{base}{path}")).send().await.unwrap();
            assert_eq!(resp.status(), 200, "{path}");

            let body: serde_json::Value = resp.json().await.unwrap();
            assert_eq!(body, json!({ "status": "UP" }));
        }

        stop.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (base, stop, handle) = spawn_server().await;

        let resp = reqwest::get(format!("{base}/metrics")).await.unwrap();
        assert_eq!(resp.status(), 404);

        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body, json!({ "message": "invalid request - route not found" }));

        stop.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
