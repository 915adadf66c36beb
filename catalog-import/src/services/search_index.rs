//! Search index client
//!
//! The index only needs leaf IDs; it re-reads the documents itself.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use shared::models::Level;
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Search index request failed: {0}")]
    Request(String),

    #[error("Search index returned {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Request(err.to_string())
    }
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn bulk_upsert(&self, level: Level, ids: &[i64]) -> Result<(), NotifyError>;

    async fn bulk_delete(&self, level: Level, ids: &[i64]) -> Result<(), NotifyError>;
}

#[derive(Serialize)]
struct IndexRequest<'a> {
    level: Level,
    ids: &'a [i64],
}

/// `POST {base}/upsert` and `POST {base}/delete` with `{level, ids}`
#[derive(Debug, Clone)]
pub struct HttpSearchIndex {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSearchIndex {
    pub fn new(base_url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post(&self, action: &str, level: Level, ids: &[i64]) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(format!("{}/{action}", self.base_url))
            .json(&IndexRequest { level, ids })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }
        tracing::debug!(action, level = %level, count = ids.len(), "Search index notified");
        Ok(())
    }
}

#[async_trait]
impl SearchIndex for HttpSearchIndex {
    async fn bulk_upsert(&self, level: Level, ids: &[i64]) -> Result<(), NotifyError> {
        self.post("upsert", level, ids).await
    }

    async fn bulk_delete(&self, level: Level, ids: &[i64]) -> Result<(), NotifyError> {
        self.post("delete", level, ids).await
    }
}

/// Used when no index is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSearchIndex;

#[async_trait]
impl SearchIndex for NoopSearchIndex {
    async fn bulk_upsert(&self, _level: Level, _ids: &[i64]) -> Result<(), NotifyError> {
        Ok(())
    }

    async fn bulk_delete(&self, _level: Level, _ids: &[i64]) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Call kind seen by [`RecordingSearchIndex`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexCall {
    Upsert(Level, Vec<i64>),
    Delete(Level, Vec<i64>),
}

/// Keeps every call in memory; can be told to fail
#[derive(Debug, Default)]
pub struct RecordingSearchIndex {
    calls: Mutex<Vec<IndexCall>>,
    fail: bool,
}

impl RecordingSearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<IndexCall> {
        self.calls.lock().clone()
    }

    fn record(&self, call: IndexCall) -> Result<(), NotifyError> {
        self.calls.lock().push(call);
        if self.fail {
            return Err(NotifyError::Request("index unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SearchIndex for RecordingSearchIndex {
    async fn bulk_upsert(&self, level: Level, ids: &[i64]) -> Result<(), NotifyError> {
        self.record(IndexCall::Upsert(level, ids.to_vec()))
    }

    async fn bulk_delete(&self, level: Level, ids: &[i64]) -> Result<(), NotifyError> {
        self.record(IndexCall::Delete(level, ids.to_vec()))
    }
}
