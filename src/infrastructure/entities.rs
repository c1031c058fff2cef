//! Database entities

use crate::shell::ResponseSnapshot;
use anyhow::Context;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, FromRow)]
pub struct CacheEntry {
    pub bucket: String,
    pub url: String,
    pub status: i64,
    /// JSON array of `[name, value bytes]` pairs, in response order.
    pub headers: String,
    pub body: Vec<u8>,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(bucket: &str, url: &str, response: &ResponseSnapshot) -> anyhow::Result<CacheEntry> {
        let headers: Vec<(&str, &[u8])> = response
            .headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_bytes()))
            .collect();

        Ok(CacheEntry {
            bucket: bucket.to_owned(),
            url: url.to_owned(),
            status: response.status.as_u16().into(),
            headers: serde_json::to_string(&headers)?,
            body: response.body.to_vec(),
            stored_at: Utc::now(),
        })
    }
}

impl TryFrom<CacheEntry> for ResponseSnapshot {
    type Error = anyhow::Error;

    fn try_from(entry: CacheEntry) -> anyhow::Result<Self> {
        let status = u16::try_from(entry.status)
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .with_context(|| format!("invalid stored status {}", entry.status))?;

        let pairs: Vec<(String, Vec<u8>)> =
            serde_json::from_str(&entry.headers).context("invalid stored headers")?;

        let mut headers = HeaderMap::with_capacity(pairs.len());
        for (name, value) in pairs {
            headers.append(
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_bytes(&value)?,
            );
        }

        Ok(ResponseSnapshot {
            status,
            headers,
            body: entry.body.into(),
        })
    }
}
