//! Shell runtime backed by a real HTTP client

use crate::shell::traits::ShellRuntime;
use crate::shell::{ResponseSnapshot, ShellRequest};
use anyhow::Context;
use async_trait::async_trait;
use log::info;
use std::sync::atomic::{AtomicBool, Ordering};

/// Fetches relative URLs against a fixed origin.
pub struct HttpRuntime {
    client: reqwest::Client,
    origin: String,
    skipped_waiting: AtomicBool,
    claimed_clients: AtomicBool,
}

impl HttpRuntime {
    pub fn new(origin: impl Into<String>) -> HttpRuntime {
        HttpRuntime {
            client: reqwest::Client::new(),
            origin: origin.into().trim_end_matches('/').to_owned(),
            skipped_waiting: AtomicBool::new(false),
            claimed_clients: AtomicBool::new(false),
        }
    }

    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_owned()
        } else if url.starts_with('/') {
            format!("{}{url}", self.origin)
        } else {
            format!("{}/{url}", self.origin)
        }
    }

    pub fn has_skipped_waiting(&self) -> bool {
        self.skipped_waiting.load(Ordering::SeqCst)
    }

    pub fn has_claimed_clients(&self) -> bool {
        self.claimed_clients.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ShellRuntime for HttpRuntime {
    async fn fetch(&self, request: &ShellRequest) -> anyhow::Result<ResponseSnapshot> {
        let url = self.resolve(&request.url);

        let response = self
            .client
            .request(request.method.clone(), &url)
            .headers(request.headers.clone())
            .body(request.body.clone())
            .send()
            .await
            .with_context(|| format!("failed to fetch {url}"))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .with_context(|| format!("failed to read body of {url}"))?;

        Ok(ResponseSnapshot {
            status,
            headers,
            body,
        })
    }

    async fn skip_waiting(&self) {
        info!("skipping wait, activating immediately");
        self.skipped_waiting.store(true, Ordering::SeqCst);
    }

    async fn claim_clients(&self) {
        info!("claiming open clients");
        self.claimed_clients.store(true, Ordering::SeqCst);
    }
}
