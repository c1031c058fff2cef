//! Chat endpoint

use crate::api::chat::schemas::ErrorResponse;
use crate::api::method_not_allowed;
use crate::core::traits::ChatService;
use axum::body::{self, Body};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use di_axum::Inject;
use log::{error, info};
use uuid::Uuid;

/// Largest chat body that is read before giving up.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub fn router() -> Router {
    Router::new().route("/api/chat", post(post_chat).fallback(method_not_allowed))
}

async fn post_chat(
    Inject(chat_service): Inject<dyn ChatService>,
    request_body: Body,
) -> Response {
    let request_id = Uuid::new_v4();

    let relayed = match body::to_bytes(request_body, MAX_BODY_BYTES).await {
        Ok(bytes) => chat_service.relay(bytes).await,
        Err(e) => Err(anyhow::Error::new(e).context("failed to read request body")),
    };

    match relayed {
        Ok(stream) => {
            info!("[{request_id}] relaying inference stream");
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/event-stream; charset=utf-8"),
                    (header::CACHE_CONTROL, "no-cache"),
                    (header::CONNECTION, "keep-alive"),
                ],
                Body::from_stream(stream),
            )
                .into_response()
        }
        Err(e) => {
            error!("[{request_id}] error processing chat request: {e:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to process request",
                }),
            )
                .into_response()
        }
    }
}

pub mod schemas {
    use serde::Serialize;

    #[derive(Serialize, Debug)]
    pub struct ErrorResponse {
        pub error: &'static str,
    }
}
