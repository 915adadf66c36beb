//! Catalog store interface
//!
//! The engine needs four things from persistence: a scoped bulk read per
//! level, bulk insert returning generated IDs, bulk update, and a
//! transaction around the writes.
//!
//! - [`MemoryStore`] - in-process store for tests and dry runs
//! - `PgCatalogStore` - PostgreSQL (feature `postgres`)

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::{FailPoint, MemoryStore};
#[cfg(feature = "postgres")]
pub use postgres::PgCatalogStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::models::Level;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::import::slots::WeeklySlot;

/// Level-specific attributes, keyed by stored column name
pub type AttrMap = BTreeMap<String, Value>;

/// One stored catalog row as the engine sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntity {
    pub id: i64,
    /// Restaurant
    pub owner_id: i64,
    /// `None` for top-level rows
    pub parent_id: Option<i64>,
    pub name: String,
    pub sequence: Option<i32>,
    pub is_deleted: bool,
    pub attrs: AttrMap,
}

/// Row handed to bulk insert (`id = None`) or bulk update
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRow {
    pub id: Option<i64>,
    pub owner_id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    pub sequence: Option<i32>,
    pub is_deleted: bool,
    /// Table columns only (slots travel separately)
    pub attrs: AttrMap,
}

/// Generated ID returned by bulk insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertedRow {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
}

/// Store error types
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Injected failure on {op} at {level}")]
    Injected { level: Level, op: &'static str },

    #[error("Placeholder {0} has no generated ID")]
    UnresolvedPlaceholder(u32),

    #[error("Insert result mismatch at {level}: {details}")]
    InsertMismatch { level: Level, details: String },
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Every row of `level` (deleted included) owned by the given restaurants
    async fn load_level(&self, level: Level, owner_ids: &[i64]) -> StoreResult<Vec<StoredEntity>>;

    async fn begin(&self) -> StoreResult<Box<dyn CatalogTx>>;
}

#[async_trait]
pub trait CatalogTx: Send {
    async fn bulk_update(&mut self, level: Level, rows: &[EntityRow]) -> StoreResult<()>;

    /// Insert rows; the result carries one entry per input row
    async fn bulk_insert(&mut self, level: Level, rows: &[EntityRow]) -> StoreResult<Vec<InsertedRow>>;

    /// Replace the complete slot set of each listed Menu Item
    async fn replace_weekly_slots(&mut self, slots: &[(i64, Vec<WeeklySlot>)]) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// Load every level of a snapshot, one round-trip per level
pub async fn load_snapshot(
    store: &dyn CatalogStore,
    levels: &[Level],
    owner_ids: &[i64],
) -> StoreResult<HashMap<Level, Vec<StoredEntity>>> {
    let mut snapshot = HashMap::with_capacity(levels.len());
    for &level in levels {
        let rows = store.load_level(level, owner_ids).await?;
        tracing::debug!(level = %level, rows = rows.len(), "Snapshot level loaded");
        snapshot.insert(level, rows);
    }
    Ok(snapshot)
}
