//! In-process cache storage

use crate::shell::ResponseSnapshot;
use crate::shell::traits::CacheStorage;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

type Bucket = BTreeMap<String, ResponseSnapshot>;

#[derive(Default)]
pub struct MemoryCacheStorage {
    buckets: RwLock<BTreeMap<String, Bucket>>,
}

impl MemoryCacheStorage {
    pub fn new() -> MemoryCacheStorage {
        MemoryCacheStorage::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, bucket: &str) -> anyhow::Result<()> {
        self.buckets
            .write()
            .await
            .entry(bucket.to_owned())
            .or_default();
        Ok(())
    }

    async fn keys(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.buckets.read().await.keys().cloned().collect())
    }

    async fn delete(&self, bucket: &str) -> anyhow::Result<bool> {
        Ok(self.buckets.write().await.remove(bucket).is_some())
    }

    async fn lookup(&self, bucket: &str, url: &str) -> anyhow::Result<Option<ResponseSnapshot>> {
        Ok(self
            .buckets
            .read()
            .await
            .get(bucket)
            .and_then(|entries| entries.get(url))
            .cloned())
    }

    async fn put(
        &self,
        bucket: &str,
        url: &str,
        response: ResponseSnapshot,
    ) -> anyhow::Result<()> {
        self.buckets
            .write()
            .await
            .entry(bucket.to_owned())
            .or_default()
            .insert(url.to_owned(), response);
        Ok(())
    }

    async fn urls(&self, bucket: &str) -> anyhow::Result<Vec<String>> {
        Ok(self
            .buckets
            .read()
            .await
            .get(bucket)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default())
    }
}
