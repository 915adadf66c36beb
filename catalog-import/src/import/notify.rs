//! Downstream Notifier
//!
//! After commit the search index learns which leaf documents changed.
//! Child-level edits (variants, mappings) count as an upsert of the leaf
//! that owns them. Failures are logged; the import already succeeded.

use shared::models::Level;
use std::collections::BTreeSet;

use super::entity::{ParentKey, ResolvedBatch, TempId};
use super::schema::{ImportSchema, level_schema};
use super::writer::IdRemap;
use crate::services::SearchIndex;

/// Leaf IDs to push to the search index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafChanges {
    pub level: Level,
    pub upserted: Vec<i64>,
    pub deleted: Vec<i64>,
}

impl LeafChanges {
    pub fn is_empty(&self) -> bool {
        self.upserted.is_empty() && self.deleted.is_empty()
    }
}

pub fn collect_leaf_changes(schema: &ImportSchema, batch: &ResolvedBatch, remap: &IdRemap) -> LeafChanges {
    let leaf = schema.notify_level;
    let mut upserted = BTreeSet::new();
    let mut deleted = BTreeSet::new();

    for &level in schema.levels {
        let Some(arena) = batch.arena(level) else {
            continue;
        };
        for (_, entity) in arena.iter().filter(|(_, e)| e.is_changed()) {
            if level == leaf {
                let Ok(id) = remap.resolve(entity.id) else {
                    continue;
                };
                if entity.is_deleted {
                    deleted.insert(id);
                } else {
                    upserted.insert(id);
                }
            } else if let Some(owner) = owning_leaf(batch, level, entity.parent, leaf)
                && let Ok(id) = remap.resolve(owner)
            {
                upserted.insert(id);
            }
        }
    }

    upserted.retain(|id| !deleted.contains(id));
    LeafChanges {
        level: leaf,
        upserted: upserted.into_iter().collect(),
        deleted: deleted.into_iter().collect(),
    }
}

/// Walk up from `parent` (the parent of an entity at `level`) to the leaf level
fn owning_leaf(batch: &ResolvedBatch, level: Level, parent: ParentKey, leaf: Level) -> Option<TempId> {
    let parent_level = level_schema(level).parent?;
    let ParentKey::Entity(parent_id) = parent else {
        return None;
    };
    if parent_level == leaf {
        let arena = batch.arena(leaf)?;
        let owner = arena.get(arena.find_by_id(parent_id)?);
        return owner.is_live().then_some(parent_id);
    }
    let arena = batch.arena(parent_level)?;
    let next = arena.get(arena.find_by_id(parent_id)?);
    owning_leaf(batch, parent_level, next.parent, leaf)
}

/// Push upserts and deletes concurrently
pub async fn notify(index: &dyn SearchIndex, changes: &LeafChanges) {
    if changes.is_empty() {
        return;
    }
    let level = changes.level;

    let upsert = async {
        if changes.upserted.is_empty() {
            return Ok(());
        }
        index.bulk_upsert(level, &changes.upserted).await
    };
    let delete = async {
        if changes.deleted.is_empty() {
            return Ok(());
        }
        index.bulk_delete(level, &changes.deleted).await
    };
    let (upsert, delete) = futures::join!(upsert, delete);

    if let Err(e) = upsert {
        tracing::warn!(level = %level, count = changes.upserted.len(), error = %e, "Search index upsert failed");
    }
    if let Err(e) = delete {
        tracing::warn!(level = %level, count = changes.deleted.len(), error = %e, "Search index delete failed");
    }
}
