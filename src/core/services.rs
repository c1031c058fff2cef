//! Implementations for the service the app needs.
//!

use crate::config::MODEL_ID;
use crate::core::chat::{self, InferenceRequest};
use crate::core::traits::{ByteStream, ChatService, InferenceBackend};
use async_trait::async_trait;
use axum::body::Bytes;
use di::{Ref, injectable};
use log::debug;

#[injectable(ChatService)]
pub struct RelayChatService {
    inference: Ref<dyn InferenceBackend>,
}

#[async_trait]
impl ChatService for RelayChatService {
    async fn relay(&self, body: Bytes) -> anyhow::Result<ByteStream> {
        let mut messages = chat::parse_messages(&body)?;

        if chat::ensure_system_prompt(&mut messages) {
            debug!("no system message in request, using default prompt");
        }

        self.inference
            .run(MODEL_ID, InferenceRequest::streaming(messages))
            .await
    }
}
