//! Offline cache shell.
//!
//! Install/activate/fetch lifecycle over one versioned cache bucket. Requests under `/api/`
//! always go to the network. Everything else is served cache-first, with successful GETs
//! persisted in the background and navigations falling back to the cached root document when
//! the network is unreachable.

use crate::config::{CACHE_NAME, SHELL_ASSETS};
use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use log::{debug, info, warn};
use std::sync::Arc;

pub mod memory;
pub mod network;
pub mod traits;

pub use traits::{CacheStorage, ShellRuntime};

const API_PREFIX: &str = "/api/";
const ROOT_DOCUMENT: &str = "/";

/// How the intercepted request was issued by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    Navigate,
    #[default]
    SameOrigin,
}

#[derive(Debug, Clone)]
pub struct ShellRequest {
    pub method: Method,
    pub url: String,
    pub mode: RequestMode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ShellRequest {
    pub fn new(method: Method, url: impl Into<String>) -> ShellRequest {
        ShellRequest {
            method,
            url: url.into(),
            mode: RequestMode::default(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> ShellRequest {
        ShellRequest::new(Method::GET, url)
    }

    /// A top-level page load.
    pub fn navigate(url: impl Into<String>) -> ShellRequest {
        ShellRequest {
            mode: RequestMode::Navigate,
            ..ShellRequest::get(url)
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> ShellRequest {
        self.body = body.into();
        self
    }

    pub fn path(&self) -> String {
        match self.url.parse::<Uri>() {
            Ok(uri) => uri.path().to_owned(),
            Err(_) => self.url.clone(),
        }
    }

    /// Key the request is stored under: path and query, so absolute and relative URLs of the
    /// same origin share entries.
    pub fn cache_key(&self) -> String {
        match self.url.parse::<Uri>() {
            Ok(uri) => uri
                .path_and_query()
                .map(|pq| pq.as_str().to_owned())
                .unwrap_or(ROOT_DOCUMENT.to_owned()),
            Err(_) => self.url.clone(),
        }
    }

    fn is_api(&self) -> bool {
        self.path().starts_with(API_PREFIX)
    }
}

/// A stored or freshly fetched response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSnapshot {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ResponseSnapshot {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> ResponseSnapshot {
        ResponseSnapshot {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

/// Outcome of pre-populating the bucket.
#[derive(Debug, Default, PartialEq)]
pub struct InstallReport {
    pub cached: Vec<String>,
    pub skipped: Vec<String>,
}

pub struct OfflineShell {
    version: String,
    assets: Vec<String>,
    storage: Arc<dyn CacheStorage>,
    runtime: Arc<dyn ShellRuntime>,
}

impl OfflineShell {
    /// A shell using the built-in bucket name and asset list.
    pub fn new(storage: Arc<dyn CacheStorage>, runtime: Arc<dyn ShellRuntime>) -> OfflineShell {
        OfflineShell {
            version: CACHE_NAME.to_owned(),
            assets: SHELL_ASSETS.iter().map(|a| a.to_string()).collect(),
            storage,
            runtime,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> OfflineShell {
        self.version = version.into();
        self
    }

    pub fn with_assets<I, S>(mut self, assets: I) -> OfflineShell
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assets = assets.into_iter().map(Into::into).collect();
        self
    }

    /// Opens the bucket and caches whichever shell assets can be fetched, then asks to be
    /// activated right away.
    ///
    /// Only a failure to open the bucket is returned as `Err`.
    pub async fn install(&self) -> anyhow::Result<InstallReport> {
        self.storage.open(&self.version).await?;

        let mut report = InstallReport::default();

        for asset in &self.assets {
            let request = ShellRequest::get(asset.as_str());

            let stored = match self.runtime.fetch(&request).await {
                Ok(response) if response.status.is_success() => self
                    .storage
                    .put(&self.version, &request.cache_key(), response)
                    .await
                    .map_err(|e| warn!("failed to store shell asset {asset}: {e:#}"))
                    .is_ok(),
                Ok(response) => {
                    debug!("not caching shell asset {asset}: {}", response.status);
                    false
                }
                Err(e) => {
                    debug!("not caching shell asset {asset}: {e:#}");
                    false
                }
            };

            if stored {
                report.cached.push(asset.clone());
            } else {
                report.skipped.push(asset.clone());
            }
        }

        info!(
            "installed {}: {} assets cached, {} skipped",
            self.version,
            report.cached.len(),
            report.skipped.len()
        );

        self.runtime.skip_waiting().await;

        Ok(report)
    }

    /// Deletes every bucket but the current one and takes control of open clients.
    ///
    /// Returns the names of the deleted buckets.
    pub async fn activate(&self) -> anyhow::Result<Vec<String>> {
        let mut deleted = Vec::new();

        for bucket in self.storage.keys().await? {
            if bucket != self.version && self.storage.delete(&bucket).await? {
                info!("deleted stale cache {bucket}");
                deleted.push(bucket);
            }
        }

        self.runtime.claim_clients().await;

        Ok(deleted)
    }

    /// Answers an intercepted request.
    pub async fn fetch(&self, request: ShellRequest) -> anyhow::Result<ResponseSnapshot> {
        if request.is_api() {
            return self.runtime.fetch(&request).await;
        }

        let key = request.cache_key();

        // Only GET responses are ever stored, so other methods never match.
        if request.method == Method::GET {
            if let Some(cached) = self.storage.lookup(&self.version, &key).await? {
                return Ok(cached);
            }
        }

        match self.runtime.fetch(&request).await {
            Ok(response) => {
                if request.method == Method::GET && response.status == StatusCode::OK {
                    self.store_in_background(key, response.clone());
                }
                Ok(response)
            }
            Err(e) if request.mode == RequestMode::Navigate => {
                match self.storage.lookup(&self.version, ROOT_DOCUMENT).await? {
                    Some(root) => {
                        debug!("network unavailable for {key}, serving cached root document");
                        Ok(root)
                    }
                    None => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    fn store_in_background(&self, key: String, response: ResponseSnapshot) {
        let storage = self.storage.clone();
        let bucket = self.version.clone();

        tokio::spawn(async move {
            if let Err(e) = storage.put(&bucket, &key, response).await {
                warn!("failed to cache {key}: {e:#}");
            }
        });
    }
}
