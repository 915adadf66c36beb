//! In-memory catalog store
//!
//! A transaction works on a private copy of the tables and replaces the
//! shared state on commit, so a failed import leaves nothing behind.
//! Concurrent writers are not merged: the last commit wins.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared::models::Level;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{CatalogStore, CatalogTx, EntityRow, InsertedRow, StoreError, StoreResult, StoredEntity};
use crate::import::slots::{self, WEEKLY_SLOTS, WeeklySlot};

/// First ID handed out to generated rows
const FIRST_GENERATED_ID: i64 = 1000;

/// Operation to fail, for exercising rollback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Insert(Level),
    Update(Level),
    Slots,
    Commit,
}

#[derive(Debug, Clone)]
struct MemoryState {
    tables: HashMap<Level, BTreeMap<i64, StoredEntity>>,
    slots: BTreeMap<i64, Vec<WeeklySlot>>,
    next_id: i64,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            tables: HashMap::new(),
            slots: BTreeMap::new(),
            next_id: FIRST_GENERATED_ID,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
    fail_point: Arc<RwLock<Option<FailPoint>>>,
    loads: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row with a caller-chosen ID
    pub fn insert_entity(&self, level: Level, entity: StoredEntity) {
        let mut state = self.state.write();
        state.next_id = state.next_id.max(entity.id + 1);
        state.tables.entry(level).or_default().insert(entity.id, entity);
    }

    pub fn set_weekly_slots(&self, item_id: i64, item_slots: Vec<WeeklySlot>) {
        self.state.write().slots.insert(item_id, item_slots);
    }

    /// All rows of a level, by ID
    pub fn entities(&self, level: Level) -> Vec<StoredEntity> {
        self.state
            .read()
            .tables
            .get(&level)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn entity(&self, level: Level, id: i64) -> Option<StoredEntity> {
        self.state.read().tables.get(&level)?.get(&id).cloned()
    }

    pub fn find_by_name(&self, level: Level, name: &str) -> Option<StoredEntity> {
        self.entities(level).into_iter().find(|e| e.name == name)
    }

    pub fn weekly_slots(&self, item_id: i64) -> Vec<WeeklySlot> {
        self.state
            .read()
            .slots
            .get(&item_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn fail_on(&self, point: FailPoint) {
        *self.fail_point.write() = Some(point);
    }

    pub fn clear_failure(&self) {
        *self.fail_point.write() = None;
    }

    /// Number of `load_level` calls served
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn load_level(&self, level: Level, owner_ids: &[i64]) -> StoreResult<Vec<StoredEntity>> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        let state = self.state.read();
        let Some(table) = state.tables.get(&level) else {
            return Ok(Vec::new());
        };

        let rows = table
            .values()
            .filter(|e| owner_ids.contains(&e.owner_id))
            .map(|e| {
                let mut row = e.clone();
                if level == Level::MenuItem {
                    let item_slots = state.slots.get(&e.id).cloned().unwrap_or_default();
                    row.attrs
                        .insert(WEEKLY_SLOTS.to_string(), slots::slots_to_value(&item_slots));
                }
                row
            })
            .collect();
        Ok(rows)
    }

    async fn begin(&self) -> StoreResult<Box<dyn CatalogTx>> {
        Ok(Box::new(MemoryTx {
            shared: Arc::clone(&self.state),
            staged: self.state.read().clone(),
            fail_point: *self.fail_point.read(),
        }))
    }
}

struct MemoryTx {
    shared: Arc<RwLock<MemoryState>>,
    staged: MemoryState,
    fail_point: Option<FailPoint>,
}

impl MemoryTx {
    fn check(&self, point: FailPoint, level: Level, op: &'static str) -> StoreResult<()> {
        if self.fail_point == Some(point) {
            return Err(StoreError::Injected { level, op });
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogTx for MemoryTx {
    async fn bulk_update(&mut self, level: Level, rows: &[EntityRow]) -> StoreResult<()> {
        self.check(FailPoint::Update(level), level, "update")?;
        let table = self.staged.tables.entry(level).or_default();
        for row in rows {
            let id = row.id.ok_or_else(|| StoreError::Database("update row without id".into()))?;
            let entity = table
                .get_mut(&id)
                .ok_or_else(|| StoreError::Database(format!("{level} {id} not found")))?;
            entity.parent_id = row.parent_id;
            entity.name = row.name.clone();
            entity.sequence = row.sequence;
            entity.is_deleted = row.is_deleted;
            entity.attrs = row.attrs.clone();
        }
        Ok(())
    }

    async fn bulk_insert(&mut self, level: Level, rows: &[EntityRow]) -> StoreResult<Vec<InsertedRow>> {
        self.check(FailPoint::Insert(level), level, "insert")?;
        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            let id = self.staged.next_id;
            self.staged.next_id += 1;
            self.staged.tables.entry(level).or_default().insert(
                id,
                StoredEntity {
                    id,
                    owner_id: row.owner_id,
                    parent_id: row.parent_id,
                    name: row.name.clone(),
                    sequence: row.sequence,
                    is_deleted: row.is_deleted,
                    attrs: row.attrs.clone(),
                },
            );
            inserted.push(InsertedRow {
                id,
                parent_id: row.parent_id,
                name: row.name.clone(),
            });
        }
        Ok(inserted)
    }

    async fn replace_weekly_slots(&mut self, item_slots: &[(i64, Vec<WeeklySlot>)]) -> StoreResult<()> {
        self.check(FailPoint::Slots, Level::MenuItem, "replace slots")?;
        for (item_id, set) in item_slots {
            if set.is_empty() {
                self.staged.slots.remove(item_id);
            } else {
                self.staged.slots.insert(*item_id, set.clone());
            }
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        if self.fail_point == Some(FailPoint::Commit) {
            return Err(StoreError::Transaction("injected commit failure".into()));
        }
        *self.shared.write() = self.staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::AttrMap;

    fn row(name: &str) -> EntityRow {
        EntityRow {
            id: None,
            owner_id: 1,
            parent_id: None,
            name: name.to_string(),
            sequence: Some(1),
            is_deleted: false,
            attrs: AttrMap::new(),
        }
    }

    #[tokio::test]
    async fn test_commit_publishes_staged_rows() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let inserted = tx.bulk_insert(Level::MainCategory, &[row("Drinks")]).await.unwrap();
        assert_eq!(inserted[0].id, FIRST_GENERATED_ID);
        assert!(store.entities(Level::MainCategory).is_empty());

        tx.commit().await.unwrap();
        assert_eq!(store.entities(Level::MainCategory)[0].name, "Drinks");
    }

    #[tokio::test]
    async fn test_rollback_discards() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.bulk_insert(Level::MainCategory, &[row("Drinks")]).await.unwrap();
        tx.rollback().await.unwrap();
        assert!(store.entities(Level::MainCategory).is_empty());
    }

    #[tokio::test]
    async fn test_fail_point() {
        let store = MemoryStore::new();
        store.fail_on(FailPoint::Insert(Level::MenuItem));
        let mut tx = store.begin().await.unwrap();
        assert!(tx.bulk_insert(Level::MainCategory, &[row("A")]).await.is_ok());
        let err = tx.bulk_insert(Level::MenuItem, &[row("B")]).await.unwrap_err();
        assert!(matches!(err, StoreError::Injected { level: Level::MenuItem, .. }));

        store.clear_failure();
        let mut tx = store.begin().await.unwrap();
        assert!(tx.bulk_insert(Level::MenuItem, &[row("B")]).await.is_ok());
    }

    #[tokio::test]
    async fn test_load_is_scoped_and_attaches_slots() {
        let store = MemoryStore::new();
        for (id, owner) in [(1, 1), (2, 2)] {
            store.insert_entity(
                Level::MenuItem,
                StoredEntity {
                    id,
                    owner_id: owner,
                    parent_id: Some(10),
                    name: format!("item-{id}"),
                    sequence: Some(1),
                    is_deleted: false,
                    attrs: AttrMap::new(),
                },
            );
        }
        let slot = WeeklySlot {
            weekday: 0,
            slot_num: 1,
            open_time: 900,
            close_time: 1200,
        };
        store.set_weekly_slots(1, vec![slot]);

        let rows = store.load_level(Level::MenuItem, &[1]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(slots::slots_from_value(&rows[0].attrs[WEEKLY_SLOTS]), vec![slot]);
        assert_eq!(store.load_count(), 1);
    }
}
