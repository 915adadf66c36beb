//! Transactional Writer
//!
//! Persists a resolved batch inside one store transaction, level by level
//! from parent to child. Updates go first, then inserts; generated IDs are
//! matched back to their placeholders by `(parent_id, name)` before the next
//! level is written, so children always reference real IDs.

use shared::models::Level;
use std::collections::HashMap;

use super::entity::{Entity, EntityState, LevelArena, ParentKey, ResolvedBatch, TempId, name_key};
use super::schema::{ImportSchema, level_schema};
use super::slots::{self, WEEKLY_SLOTS, WeeklySlot};
use crate::db::{AttrMap, CatalogStore, CatalogTx, EntityRow, StoreError, StoreResult};

/// Placeholder token → generated ID
#[derive(Debug, Default, Clone)]
pub struct IdRemap {
    ids: HashMap<u32, i64>,
}

impl IdRemap {
    pub fn get(&self, token: u32) -> Option<i64> {
        self.ids.get(&token).copied()
    }

    /// Real ID for any entity identity
    pub fn resolve(&self, id: TempId) -> StoreResult<i64> {
        match id {
            TempId::Persisted(id) => Ok(id),
            TempId::Pending(token) => self.get(token).ok_or(StoreError::UnresolvedPlaceholder(token)),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Write every changed entity of the batch, all or nothing
pub async fn write_batch(
    store: &dyn CatalogStore,
    schema: &ImportSchema,
    batch: &ResolvedBatch,
) -> StoreResult<IdRemap> {
    let mut tx = store.begin().await?;
    match write_levels(&mut *tx, schema, batch).await {
        Ok(remap) => {
            tx.commit().await?;
            Ok(remap)
        }
        Err(e) => {
            tracing::error!(kind = %schema.kind, error = %e, "Catalog write failed, rolling back");
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(error = %rollback_err, "Rollback failed");
            }
            Err(e)
        }
    }
}

async fn write_levels(
    tx: &mut dyn CatalogTx,
    schema: &ImportSchema,
    batch: &ResolvedBatch,
) -> StoreResult<IdRemap> {
    let mut remap = IdRemap::default();

    for &level in schema.levels {
        let Some(arena) = batch.arena(level) else {
            continue;
        };

        let mut updates = Vec::new();
        let mut inserts = Vec::new();
        let mut pending = Vec::new();
        for (_, entity) in arena.iter() {
            match (entity.state, entity.id) {
                (EntityState::Modified, TempId::Persisted(id)) => {
                    let mut row = entity_row(level, entity, &remap)?;
                    row.id = Some(id);
                    updates.push(row);
                }
                (EntityState::Created, TempId::Pending(token)) => {
                    inserts.push(entity_row(level, entity, &remap)?);
                    pending.push(token);
                }
                _ => {}
            }
        }

        if !updates.is_empty() {
            tx.bulk_update(level, &updates).await?;
        }
        if !inserts.is_empty() {
            let inserted = tx.bulk_insert(level, &inserts).await?;
            match_generated_ids(level, &inserts, &pending, inserted, &mut remap)?;
        }
        tracing::debug!(
            level = %level,
            updated = updates.len(),
            inserted = inserts.len(),
            "Level written"
        );

        if level == Level::MenuItem {
            let item_slots = touched_slots(arena, &remap)?;
            if !item_slots.is_empty() {
                tx.replace_weekly_slots(&item_slots).await?;
            }
        }
    }

    Ok(remap)
}

fn parent_id(parent: ParentKey, remap: &IdRemap) -> StoreResult<Option<i64>> {
    match parent {
        ParentKey::Owner(_) => Ok(None),
        ParentKey::Entity(id) => remap.resolve(id).map(Some),
    }
}

fn entity_row(level: Level, entity: &Entity, remap: &IdRemap) -> StoreResult<EntityRow> {
    let attrs: AttrMap = level_schema(level)
        .column_attributes()
        .map(|spec| (spec.name.to_string(), entity.attr(spec.name).clone()))
        .collect();
    Ok(EntityRow {
        id: None,
        owner_id: entity.owner_id,
        parent_id: parent_id(entity.parent, remap)?,
        name: entity.name.clone(),
        sequence: entity.sequence,
        is_deleted: entity.is_deleted,
        attrs,
    })
}

/// Pair generated IDs with placeholders by `(parent_id, name)`
fn match_generated_ids(
    level: Level,
    inserts: &[EntityRow],
    pending: &[u32],
    inserted: Vec<crate::db::InsertedRow>,
    remap: &mut IdRemap,
) -> StoreResult<()> {
    if inserted.len() != inserts.len() {
        return Err(StoreError::InsertMismatch {
            level,
            details: format!("sent {} rows, got {} ids", inserts.len(), inserted.len()),
        });
    }

    let mut by_key: HashMap<(Option<i64>, String), u32> = inserts
        .iter()
        .zip(pending)
        .map(|(row, &token)| ((row.parent_id, name_key(&row.name)), token))
        .collect();

    for row in inserted {
        let key = (row.parent_id, name_key(&row.name));
        let token = by_key.remove(&key).ok_or_else(|| StoreError::InsertMismatch {
            level,
            details: format!("unexpected row '{}' under {:?}", row.name, row.parent_id),
        })?;
        remap.ids.insert(token, row.id);
    }
    Ok(())
}

/// Items whose slot set was written in this run
fn touched_slots(arena: &LevelArena, remap: &IdRemap) -> StoreResult<Vec<(i64, Vec<WeeklySlot>)>> {
    arena
        .iter()
        .filter(|(_, e)| e.is_changed() && e.dirty.contains(WEEKLY_SLOTS))
        .map(|(_, e)| Ok((remap.resolve(e.id)?, slots::slots_from_value(e.attr(WEEKLY_SLOTS)))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{FailPoint, MemoryStore, StoredEntity};
    use crate::import::schema::import_schema;
    use serde_json::json;
    use shared::models::ImportKind;
    use std::collections::BTreeSet;

    fn created(token: u32, parent: ParentKey, name: &str, attrs: AttrMap) -> Entity {
        Entity {
            id: TempId::Pending(token),
            owner_id: 1,
            parent,
            name: name.to_string(),
            sequence: Some(1),
            stored_sequence: None,
            stored_parent: None,
            is_deleted: false,
            dirty: attrs.keys().cloned().collect::<BTreeSet<_>>(),
            attrs,
            state: EntityState::Created,
            claimed_by: Some(0),
        }
    }

    /// Drinks → (default) → Cola, all new
    fn new_chain() -> ResolvedBatch {
        let mut batch = ResolvedBatch::default();
        let main = batch.allocate_token();
        let sub = batch.allocate_token();
        let item = batch.allocate_token();
        batch
            .arena_mut(Level::MainCategory)
            .push(created(main, ParentKey::Owner(1), "Drinks", AttrMap::new()));
        batch.arena_mut(Level::SubCategory).push(created(
            sub,
            ParentKey::Entity(TempId::Pending(main)),
            "",
            AttrMap::new(),
        ));
        let slot = WeeklySlot {
            weekday: 0,
            slot_num: 1,
            open_time: 900,
            close_time: 1200,
        };
        batch.arena_mut(Level::MenuItem).push(created(
            item,
            ParentKey::Entity(TempId::Pending(sub)),
            "Cola",
            AttrMap::from([
                ("price".to_string(), json!("50")),
                (WEEKLY_SLOTS.to_string(), slots::slots_to_value(&[slot])),
            ]),
        ));
        batch
    }

    #[tokio::test]
    async fn test_placeholders_resolve_through_the_chain() {
        let store = MemoryStore::new();
        let batch = new_chain();
        let remap = write_batch(&store, import_schema(ImportKind::Menu), &batch)
            .await
            .unwrap();
        assert_eq!(remap.len(), 3);

        let main = store.find_by_name(Level::MainCategory, "Drinks").unwrap();
        let sub = store.find_by_name(Level::SubCategory, "").unwrap();
        let cola = store.find_by_name(Level::MenuItem, "Cola").unwrap();
        assert_eq!(sub.parent_id, Some(main.id));
        assert_eq!(cola.parent_id, Some(sub.id));
        assert_eq!(cola.attrs["price"], json!("50"));
        assert!(!cola.attrs.contains_key(WEEKLY_SLOTS));
        assert_eq!(store.weekly_slots(cola.id).len(), 1);
    }

    #[tokio::test]
    async fn test_failure_rolls_back_every_level() {
        let store = MemoryStore::new();
        store.fail_on(FailPoint::Insert(Level::MenuItem));
        let result = write_batch(&store, import_schema(ImportKind::Menu), &new_chain()).await;
        assert!(matches!(result, Err(StoreError::Injected { .. })));
        assert!(store.entities(Level::MainCategory).is_empty());
        assert!(store.entities(Level::SubCategory).is_empty());
    }

    #[tokio::test]
    async fn test_modified_rows_are_updated_in_place() {
        let store = MemoryStore::new();
        store.insert_entity(
            Level::AddonGroup,
            StoredEntity {
                id: 5,
                owner_id: 1,
                parent_id: None,
                name: "Sauces".into(),
                sequence: Some(1),
                is_deleted: false,
                attrs: AttrMap::from([("min_selection".to_string(), json!(0))]),
            },
        );
        let snapshot = store.load_level(Level::AddonGroup, &[1]).await.unwrap();
        let mut batch = ResolvedBatch::new(HashMap::from([(Level::AddonGroup, snapshot)]));
        let group = batch.arena_mut(Level::AddonGroup).get_mut(0);
        group.attrs.insert("min_selection".into(), json!(1));
        group.mark_modified();

        let remap = write_batch(&store, import_schema(ImportKind::Addon), &batch)
            .await
            .unwrap();
        assert!(remap.is_empty());
        let stored = store.entity(Level::AddonGroup, 5).unwrap();
        assert_eq!(stored.attrs["min_selection"], json!(1));
        assert_eq!(stored.attrs["max_selection"], json!(null));
    }
}
