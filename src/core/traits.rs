//! DI "Interfaces"

use crate::core::chat::InferenceRequest;
use async_trait::async_trait;
use axum::body::Bytes;
use futures_util::stream::BoxStream;

/// Raw response body of an inference run, relayed to the client untouched.
pub type ByteStream = BoxStream<'static, Result<Bytes, std::io::Error>>;

#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Runs `model` over the request and returns the response body as a byte stream.
    ///
    /// Any gateway routing is configured on the backend. Returns `Err` if the run could not be
    /// started. Errors after the stream was handed back surface as stream items.
    async fn run(&self, model: &str, request: InferenceRequest) -> anyhow::Result<ByteStream>;
}

#[async_trait]
pub trait ChatService: Send + Sync {
    /// Turns a raw `/api/chat` body into a streaming completion.
    ///
    /// Parsing and inference failures are not distinguished; both come back as `Err`.
    async fn relay(&self, body: Bytes) -> anyhow::Result<ByteStream>;
}
