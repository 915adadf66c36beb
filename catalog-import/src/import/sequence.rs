//! Sequence Assigner
//!
//! Keeps sibling order dense and unique per parent scope. Siblings the batch
//! does not mention keep their stored sequence in both modes.
//!
//! - **Full**: mentioned siblings are numbered from 1 in the order rows first
//!   mention them, skipping numbers held by unmentioned live siblings.
//! - **Partial**: new and moved entities are appended after the largest
//!   sequence stored in their scope. Everything else keeps its number.

use shared::models::Level;
use std::collections::{HashMap, HashSet};

use super::entity::{EntityState, LevelArena, ParentKey, ResolvedBatch};
use super::row::RowRecord;
use super::schema::{ImportSchema, level_schema};

pub fn assign_sequences(
    schema: &ImportSchema,
    batch: &mut ResolvedBatch,
    records: &[RowRecord],
    is_partial: bool,
) {
    for &level in schema.levels {
        if !level_schema(level).sequenced {
            continue;
        }
        let mentioned = mentioned_in_order(records, level);
        let arena = batch.arena_mut(level);
        if is_partial {
            append_new(arena, &mentioned);
        } else {
            renumber(arena, &mentioned);
        }
    }
}

/// Arena indices in first-mention order, rejected rows excluded
fn mentioned_in_order(records: &[RowRecord], level: Level) -> Vec<usize> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| !r.is_rejected())
        .filter_map(|r| r.resolved_at(level))
        .filter(|idx| seen.insert(*idx))
        .collect()
}

fn renumber(arena: &mut LevelArena, mentioned: &[usize]) {
    let mentioned_set: HashSet<usize> = mentioned.iter().copied().collect();
    let mut held: HashMap<ParentKey, HashSet<i32>> = HashMap::new();
    for (idx, entity) in arena.iter() {
        if entity.is_live()
            && !mentioned_set.contains(&idx)
            && let Some(seq) = entity.sequence
        {
            held.entry(entity.parent).or_default().insert(seq);
        }
    }

    let mut next: HashMap<ParentKey, i32> = HashMap::new();
    for &idx in mentioned {
        let entity = arena.get(idx);
        if !entity.is_live() || entity.state == EntityState::Conflicted {
            continue;
        }
        let scope = entity.parent;
        let taken = held.get(&scope);
        let counter = next.entry(scope).or_insert(0);
        *counter += 1;
        while taken.is_some_and(|t| t.contains(&*counter)) {
            *counter += 1;
        }
        let seq = *counter;
        arena.get_mut(idx).set_sequence(seq);
    }
}

fn append_new(arena: &mut LevelArena, mentioned: &[usize]) {
    // Stored maxima per stored scope, deleted siblings included
    let mut max_by_scope: HashMap<ParentKey, i32> = HashMap::new();
    for (_, entity) in arena.iter() {
        if let (Some(seq), Some(scope)) = (entity.stored_sequence, entity.stored_parent) {
            let max = max_by_scope.entry(scope).or_insert(0);
            *max = (*max).max(seq);
        }
    }

    for &idx in mentioned {
        let entity = arena.get(idx);
        let placed = entity.state == EntityState::Created || entity.is_reparented();
        if !placed || entity.state == EntityState::Conflicted {
            continue;
        }
        let max = max_by_scope.entry(entity.parent).or_insert(0);
        *max += 1;
        let seq = *max;
        arena.get_mut(idx).set_sequence(seq);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AttrMap, StoredEntity};
    use crate::import::entity::{Entity, TempId};
    use std::collections::BTreeSet;

    fn stored(id: i64, seq: i32) -> StoredEntity {
        StoredEntity {
            id,
            owner_id: 1,
            parent_id: None,
            name: format!("cat-{id}"),
            sequence: Some(seq),
            is_deleted: false,
            attrs: AttrMap::new(),
        }
    }

    fn new_entity(token: u32, name: &str) -> Entity {
        Entity {
            id: TempId::Pending(token),
            owner_id: 1,
            parent: ParentKey::Owner(1),
            name: name.to_string(),
            sequence: None,
            stored_sequence: None,
            stored_parent: None,
            is_deleted: false,
            attrs: AttrMap::new(),
            state: EntityState::Created,
            claimed_by: Some(0),
            dirty: BTreeSet::new(),
        }
    }

    fn sequences(arena: &LevelArena) -> Vec<Option<i32>> {
        arena.iter().map(|(_, e)| e.sequence).collect()
    }

    /// Stored: A(1) B(2) C(3)
    fn arena() -> LevelArena {
        LevelArena::new(Level::MainCategory, vec![stored(1, 1), stored(2, 2), stored(3, 3)])
    }

    #[test]
    fn test_full_mode_untouched_siblings_keep_sequence() {
        let mut arena = arena();
        let new = arena.push(new_entity(1, "New"));
        // batch mentions C then New; A and B keep 1 and 2
        renumber(&mut arena, &[2, new]);
        assert_eq!(sequences(&arena), vec![Some(1), Some(2), Some(3), Some(4)]);
        for idx in 0..3 {
            assert_eq!(arena.get(idx).state, EntityState::Unchanged);
        }
    }

    #[test]
    fn test_full_mode_reorders_mentioned() {
        let mut arena = arena();
        renumber(&mut arena, &[2, 0, 1]);
        // C=1 A=2 B=3
        assert_eq!(sequences(&arena), vec![Some(2), Some(3), Some(1)]);
        assert!(arena.iter().all(|(_, e)| e.state == EntityState::Modified));
    }

    #[test]
    fn test_full_mode_same_order_is_stable() {
        let mut arena = arena();
        renumber(&mut arena, &[0, 1, 2]);
        assert_eq!(sequences(&arena), vec![Some(1), Some(2), Some(3)]);
        assert!(arena.iter().all(|(_, e)| e.state == EntityState::Unchanged));
    }

    #[test]
    fn test_full_mode_one_new_sibling() {
        let mut arena = LevelArena::new(
            Level::MainCategory,
            (1..=5).map(|id| stored(id, id as i32)).collect(),
        );
        let new = arena.push(new_entity(1, "New"));
        renumber(&mut arena, &[new]);
        assert_eq!(arena.get(new).sequence, Some(6));
        assert_eq!(
            arena.iter().filter(|(_, e)| e.state == EntityState::Modified).count(),
            0
        );
    }

    #[test]
    fn test_full_mode_skips_deleted() {
        let mut arena = LevelArena::new(
            Level::MainCategory,
            vec![stored(1, 2), stored(2, 5), stored(3, 9)],
        );
        arena.get_mut(1).is_deleted = true;
        renumber(&mut arena, &[0]);
        assert_eq!(arena.get(0).sequence, Some(1));
        assert_eq!(arena.get(1).sequence, Some(5));
        assert_eq!(arena.get(2).sequence, Some(9));
        assert_eq!(arena.get(2).state, EntityState::Unchanged);
    }

    #[test]
    fn test_partial_mode_appends_after_stored_max() {
        let mut arena = arena();
        let first = arena.push(new_entity(1, "X"));
        let second = arena.push(new_entity(2, "Y"));
        append_new(&mut arena, &[second, 2, first]);
        assert_eq!(arena.get(second).sequence, Some(4));
        assert_eq!(arena.get(first).sequence, Some(5));
        assert_eq!(arena.get(2).sequence, Some(3));
        assert_eq!(arena.get(2).state, EntityState::Unchanged);
    }

    #[test]
    fn test_partial_mode_moved_entity_appends_in_new_scope() {
        let child = |id: i64, parent: i64| StoredEntity {
            parent_id: Some(parent),
            ..stored(id, 1)
        };
        // Dal(1) under sub 10, Cola(1) under sub 20
        let mut arena = LevelArena::new(Level::MenuItem, vec![child(1, 10), child(2, 20)]);
        arena.get_mut(0).parent = ParentKey::Entity(TempId::Persisted(20));
        append_new(&mut arena, &[0]);
        assert_eq!(arena.get(0).sequence, Some(2));
        assert_eq!(arena.get(0).state, EntityState::Modified);
        assert_eq!(arena.get(1).sequence, Some(1));
    }
}
