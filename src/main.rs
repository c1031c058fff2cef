//! Edge chat relay: static assets plus a streaming chat endpoint in front of hosted inference
//!
//! (c) Softlandia 2025

use edge_chat_relay::api;
use edge_chat_relay::config::Settings;
use edge_chat_relay::core::services::RelayChatService;
use edge_chat_relay::infrastructure::workers_ai::WorkersAiClient;

use anyhow::{Context, anyhow};
use di::{Injectable, ServiceCollection};
use di_axum::RouterServiceProviderExtensions;
use log::info;
use tokio::runtime::{Builder, Runtime};

fn main() -> anyhow::Result<()> {
    // initialize tracing
    tracing_subscriber::fmt::init();

    let settings = Settings::from_env();

    let runtime: Runtime = Builder::new_multi_thread().enable_all().build()?;

    runtime.block_on(web_server_task(settings))
}

async fn web_server_task(settings: Settings) -> anyhow::Result<()> {
    let provider = ServiceCollection::new()
        .add(WorkersAiClient::singleton())
        .add(RelayChatService::scoped())
        .build_provider()
        .map_err(|e| anyhow!("invalid service configuration: {e:?}"))?;

    let app = api::router(&settings.assets_dir).with_provider(provider);

    let listener = tokio::net::TcpListener::bind(&settings.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_address))?;
    info!(
        "listening on {}, serving assets from {}",
        listener.local_addr()?,
        settings.assets_dir.display()
    );
    axum::serve(listener, app).await?;
    info!("Shutting down...");

    Ok(())
}
