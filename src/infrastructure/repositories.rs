//! DB Repository abstractions

use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::CacheEntry;
use crate::shell::ResponseSnapshot;
use crate::shell::traits::CacheStorage;
use async_trait::async_trait;
use chrono::Utc;

/// Cache buckets persisted in SQLite.
pub struct SqliteCacheStorage {
    connection: DatabaseConnection,
}

impl SqliteCacheStorage {
    pub fn new(connection: DatabaseConnection) -> SqliteCacheStorage {
        SqliteCacheStorage { connection }
    }
}

#[async_trait]
impl CacheStorage for SqliteCacheStorage {
    async fn open(&self, bucket: &str) -> anyhow::Result<()> {
        sqlx::query("INSERT OR IGNORE INTO cache_buckets (name, created_at) VALUES (?, ?)")
            .bind(bucket)
            .bind(Utc::now())
            .execute(&*self.connection)
            .await?;
        Ok(())
    }

    async fn keys(&self) -> anyhow::Result<Vec<String>> {
        let names: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM cache_buckets ORDER BY datetime(created_at) ASC, name ASC")
                .fetch_all(&*self.connection)
                .await?;
        Ok(names.into_iter().map(|(name,)| name).collect())
    }

    async fn delete(&self, bucket: &str) -> anyhow::Result<bool> {
        let mut transaction = self.connection.begin().await?;

        sqlx::query("DELETE FROM cache_entries WHERE bucket = ?")
            .bind(bucket)
            .execute(&mut *transaction)
            .await?;
        let deleted = sqlx::query("DELETE FROM cache_buckets WHERE name = ?")
            .bind(bucket)
            .execute(&mut *transaction)
            .await?
            .rows_affected();

        transaction.commit().await?;
        Ok(deleted > 0)
    }

    async fn lookup(&self, bucket: &str, url: &str) -> anyhow::Result<Option<ResponseSnapshot>> {
        let entry: Option<CacheEntry> =
            sqlx::query_as("SELECT * FROM cache_entries WHERE bucket = ? AND url = ?")
                .bind(bucket)
                .bind(url)
                .fetch_optional(&*self.connection)
                .await?;

        entry.map(ResponseSnapshot::try_from).transpose()
    }

    async fn put(
        &self,
        bucket: &str,
        url: &str,
        response: ResponseSnapshot,
    ) -> anyhow::Result<()> {
        let entry = CacheEntry::new(bucket, url, &response)?;
        let mut transaction = self.connection.begin().await?;

        sqlx::query("INSERT OR IGNORE INTO cache_buckets (name, created_at) VALUES (?, ?)")
            .bind(bucket)
            .bind(entry.stored_at)
            .execute(&mut *transaction)
            .await?;
        sqlx::query(
            "INSERT OR REPLACE INTO cache_entries (bucket, url, status, headers, body, stored_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
            .bind(&entry.bucket)
            .bind(&entry.url)
            .bind(entry.status)
            .bind(&entry.headers)
            .bind(&entry.body)
            .bind(entry.stored_at)
            .execute(&mut *transaction)
            .await?;

        transaction.commit().await?;
        Ok(())
    }

    async fn urls(&self, bucket: &str) -> anyhow::Result<Vec<String>> {
        let urls: Vec<(String,)> =
            sqlx::query_as("SELECT url FROM cache_entries WHERE bucket = ? ORDER BY url ASC")
                .bind(bucket)
                .fetch_all(&*self.connection)
                .await?;
        Ok(urls.into_iter().map(|(url,)| url).collect())
    }
}
