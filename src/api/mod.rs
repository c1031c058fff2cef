//! HTTP routing: static assets, the chat endpoint and fixed errors for the rest of `/api/`.

use axum::Router;
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::path::Path;
use tower::ServiceExt;
use tower_http::services::ServeDir;

pub mod chat;

const API_PREFIX: &str = "/api/";

/// Builds the edge router serving static assets from `assets_dir`.
///
/// The chat endpoint needs a service provider, attach one with `with_provider`.
pub fn router(assets_dir: impl AsRef<Path>) -> Router {
    let assets = ServeDir::new(assets_dir);

    chat::router()
        .fallback(move |request: Request| serve_static_or_not_found(assets.clone(), request))
}

async fn serve_static_or_not_found(assets: ServeDir, request: Request) -> Response {
    if request.uri().path().starts_with(API_PREFIX) {
        return not_found().await.into_response();
    }

    match assets.oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}

pub(crate) async fn method_not_allowed() -> (StatusCode, &'static str) {
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

pub(crate) async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}
