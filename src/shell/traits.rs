//! Platform primitives the offline shell runs over.

use crate::shell::{ResponseSnapshot, ShellRequest};
use async_trait::async_trait;

/// Named buckets of stored responses, keyed by request URL.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Creates the bucket if it does not exist yet.
    async fn open(&self, bucket: &str) -> anyhow::Result<()>;

    /// Names of all existing buckets.
    async fn keys(&self) -> anyhow::Result<Vec<String>>;

    /// Removes a bucket and everything in it. Returns `false` if it did not exist.
    async fn delete(&self, bucket: &str) -> anyhow::Result<bool>;

    async fn lookup(&self, bucket: &str, url: &str) -> anyhow::Result<Option<ResponseSnapshot>>;

    /// Stores `response` under `url`, replacing any previous entry. Creates the bucket if needed.
    async fn put(&self, bucket: &str, url: &str, response: ResponseSnapshot)
    -> anyhow::Result<()>;

    /// URLs stored in the bucket.
    async fn urls(&self, bucket: &str) -> anyhow::Result<Vec<String>>;
}

/// Network access and lifecycle signals of the hosting runtime.
#[async_trait]
pub trait ShellRuntime: Send + Sync {
    async fn fetch(&self, request: &ShellRequest) -> anyhow::Result<ResponseSnapshot>;

    /// Activate the new shell without waiting for the old one to go idle.
    async fn skip_waiting(&self);

    /// Take control of already open clients.
    async fn claim_clients(&self);
}
