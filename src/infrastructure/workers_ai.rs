//! Hosted inference over the Workers AI REST API

use crate::config::{GatewayOptions, InferenceSettings};
use crate::core::chat::InferenceRequest;
use crate::core::traits::{ByteStream, InferenceBackend};
use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use di::{inject, injectable};
use futures_util::{StreamExt, TryStreamExt};
use log::{debug, info, warn};

const SKIP_CACHE_HEADER: &str = "cf-aig-skip-cache";
const CACHE_TTL_HEADER: &str = "cf-aig-cache-ttl";

pub struct WorkersAiClient {
    client: reqwest::Client,
    settings: InferenceSettings,
}

#[injectable(InferenceBackend)]
impl WorkersAiClient {
    #[inject]
    pub fn create() -> WorkersAiClient {
        let settings = InferenceSettings::from_env();

        if settings.account_id.is_none() || settings.api_token.is_none() {
            warn!("CF_ACCOUNT_ID or CF_API_TOKEN not set, chat requests will fail");
        }
        if let Some(gateway) = &settings.gateway {
            info!("routing inference through AI gateway {}", gateway.id);
        }

        WorkersAiClient::new(settings)
    }
}

impl WorkersAiClient {
    pub fn new(settings: InferenceSettings) -> WorkersAiClient {
        WorkersAiClient {
            client: reqwest::Client::new(),
            settings,
        }
    }

    /// Gateway routing applied to every run, if enabled.
    pub fn gateway(&self) -> Option<&GatewayOptions> {
        self.settings.gateway.as_ref()
    }

    /// URL a run of `model` is posted to, going through the gateway when one is given.
    pub fn endpoint(
        &self,
        model: &str,
        gateway: Option<&GatewayOptions>,
    ) -> anyhow::Result<String> {
        let account = self
            .settings
            .account_id
            .as_deref()
            .ok_or_else(|| anyhow!("CF_ACCOUNT_ID is not configured"))?;

        Ok(match gateway {
            Some(gateway) => format!(
                "{}/{account}/{}/workers-ai/{model}",
                gateway.base_url.trim_end_matches('/'),
                gateway.id
            ),
            None => format!(
                "{}/accounts/{account}/ai/run/{model}",
                self.settings.base_url.trim_end_matches('/')
            ),
        })
    }
}

#[async_trait]
impl InferenceBackend for WorkersAiClient {
    async fn run(&self, model: &str, request: InferenceRequest) -> anyhow::Result<ByteStream> {
        let gateway = self.gateway();
        let url = self.endpoint(model, gateway)?;
        let token = self
            .settings
            .api_token
            .as_deref()
            .ok_or_else(|| anyhow!("CF_API_TOKEN is not configured"))?;

        let mut builder = self.client.post(&url).bearer_auth(token).json(&request);

        if let Some(gateway) = gateway {
            if gateway.skip_cache {
                builder = builder.header(SKIP_CACHE_HEADER, "true");
            }
            if let Some(ttl) = gateway.cache_ttl {
                builder = builder.header(CACHE_TTL_HEADER, ttl.to_string());
            }
        }

        debug!(
            "running {model} with {} messages via {url}",
            request.messages.len()
        );

        let response = builder
            .send()
            .await
            .with_context(|| format!("inference request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            bail!("inference endpoint returned {status}: {detail}");
        }

        Ok(response
            .bytes_stream()
            .map_err(std::io::Error::other)
            .boxed())
    }
}
