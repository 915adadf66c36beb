//! Run-scoped catalog snapshot
//!
//! One [`LevelArena`] per level holds every stored entity in scope plus the
//! entities created during this run. Entities are addressed by arena index;
//! identity is a [`TempId`] until the writer swaps placeholders for real IDs.

use serde_json::Value;
use shared::models::Level;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::db::{AttrMap, StoredEntity};
use crate::utils::validation::{money_from_value, money_value};

use super::schema::{AttrKind, level_schema};

/// Entity identity within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TempId {
    /// Row already in the store
    Persisted(i64),
    /// Created in this run, real ID assigned on insert
    Pending(u32),
}

/// Scope an entity lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParentKey {
    /// Top level, owned by the restaurant
    Owner(i64),
    Entity(TempId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    Unchanged,
    Created,
    Modified,
    /// Two rows asked for different results; fails the batch
    Conflicted,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: TempId,
    pub owner_id: i64,
    pub parent: ParentKey,
    /// Scope as loaded (None for new entities)
    pub stored_parent: Option<ParentKey>,
    pub name: String,
    pub sequence: Option<i32>,
    /// Sequence as loaded (None for new entities)
    pub stored_sequence: Option<i32>,
    pub is_deleted: bool,
    pub attrs: AttrMap,
    pub state: EntityState,
    /// First row that addressed this entity
    pub claimed_by: Option<usize>,
    /// Attribute keys written in this run
    pub dirty: BTreeSet<String>,
}

impl Entity {
    fn from_stored(level: Level, mut stored: StoredEntity) -> Self {
        normalize_amounts(level, &mut stored.attrs);
        let parent = match stored.parent_id {
            Some(pid) if level_schema(level).parent.is_some() => {
                ParentKey::Entity(TempId::Persisted(pid))
            }
            _ => ParentKey::Owner(stored.owner_id),
        };
        Self {
            id: TempId::Persisted(stored.id),
            owner_id: stored.owner_id,
            parent,
            stored_parent: Some(parent),
            name: stored.name,
            sequence: stored.sequence,
            stored_sequence: stored.sequence,
            is_deleted: stored.is_deleted,
            attrs: stored.attrs,
            state: EntityState::Unchanged,
            claimed_by: None,
            dirty: BTreeSet::new(),
        }
    }

    /// Implicit default sub-category (blank name), never reported
    pub fn is_hidden(&self) -> bool {
        self.name.is_empty()
    }

    pub fn is_live(&self) -> bool {
        !self.is_deleted
    }

    /// Stored entity moved to another scope in this run
    pub fn is_reparented(&self) -> bool {
        self.stored_parent.is_some_and(|p| p != self.parent)
    }

    pub fn is_changed(&self) -> bool {
        matches!(self.state, EntityState::Created | EntityState::Modified)
    }

    pub fn mark_modified(&mut self) {
        if self.state == EntityState::Unchanged {
            self.state = EntityState::Modified;
        }
    }

    pub fn attr(&self, key: &str) -> &Value {
        self.attrs.get(key).unwrap_or(&Value::Null)
    }

    /// Set the sequence, marking the entity modified on change
    pub fn set_sequence(&mut self, sequence: i32) {
        if self.sequence != Some(sequence) {
            self.sequence = Some(sequence);
            self.mark_modified();
        }
    }
}

/// Case- and whitespace-insensitive name key
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Stored amounts arrive as numbers or text depending on the store
fn normalize_amounts(level: Level, attrs: &mut AttrMap) {
    for spec in level_schema(level).attributes {
        if spec.kind != AttrKind::Decimal {
            continue;
        }
        if let Some(value) = attrs.get_mut(spec.name)
            && let Some(amount) = money_from_value(value)
        {
            *value = money_value(amount);
        }
    }
}

/// Deep equality; `2` and `2.0` compare equal
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(ia), Some(ib)) => ia == ib,
            _ => a.as_f64() == b.as_f64(),
        },
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(va, vb)| values_equal(va, vb))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(key, va)| b.get(key).is_some_and(|vb| values_equal(va, vb)))
        }
        _ => a == b,
    }
}

/// All entities of one level
#[derive(Debug)]
pub struct LevelArena {
    pub level: Level,
    entities: Vec<Entity>,
    by_id: HashMap<TempId, usize>,
    /// Live entities only
    by_name: HashMap<(ParentKey, String), usize>,
}

impl LevelArena {
    pub fn new(level: Level, stored: Vec<StoredEntity>) -> Self {
        let mut arena = Self {
            level,
            entities: Vec::with_capacity(stored.len()),
            by_id: HashMap::new(),
            by_name: HashMap::new(),
        };
        for row in stored {
            arena.push(Entity::from_stored(level, row));
        }
        arena
    }

    /// Add an entity, returning its index
    pub fn push(&mut self, entity: Entity) -> usize {
        let idx = self.entities.len();
        self.by_id.insert(entity.id, idx);
        if entity.is_live() {
            self.by_name
                .entry((entity.parent, name_key(&entity.name)))
                .or_insert(idx);
        }
        self.entities.push(entity);
        idx
    }

    pub fn get(&self, idx: usize) -> &Entity {
        &self.entities[idx]
    }

    pub fn get_mut(&mut self, idx: usize) -> &mut Entity {
        &mut self.entities[idx]
    }

    pub fn find_by_id(&self, id: TempId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    /// Live entity with this name under `parent`
    pub fn find_by_name(&self, parent: ParentKey, name: &str) -> Option<usize> {
        self.by_name.get(&(parent, name_key(name))).copied()
    }

    /// Soft-deleted entity with this name under `parent`
    pub fn find_deleted_by_name(&self, parent: ParentKey, name: &str) -> Option<usize> {
        let key = name_key(name);
        self.iter()
            .find(|(_, e)| !e.is_live() && e.parent == parent && name_key(&e.name) == key)
            .map(|(idx, _)| idx)
    }

    /// Re-key an entity after its name, parent or deleted flag changed
    pub fn reindex(&mut self, idx: usize, old_parent: ParentKey, old_name: &str) {
        let old_key = (old_parent, name_key(old_name));
        if self.by_name.get(&old_key) == Some(&idx) {
            self.by_name.remove(&old_key);
        }
        let entity = &self.entities[idx];
        if entity.is_live() {
            self.by_name
                .entry((entity.parent, name_key(&entity.name)))
                .or_insert(idx);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Entity)> {
        self.entities.iter().enumerate()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Indices grouped by parent scope, in arena order
    pub fn scopes(&self) -> HashMap<ParentKey, Vec<usize>> {
        let mut scopes: HashMap<ParentKey, Vec<usize>> = HashMap::new();
        for (idx, entity) in self.iter() {
            scopes.entry(entity.parent).or_default().push(idx);
        }
        scopes
    }
}

/// The in-memory snapshot for one batch
#[derive(Debug, Default)]
pub struct ResolvedBatch {
    arenas: BTreeMap<Level, LevelArena>,
    next_token: u32,
}

impl ResolvedBatch {
    pub fn new(snapshot: HashMap<Level, Vec<StoredEntity>>) -> Self {
        let arenas = snapshot
            .into_iter()
            .map(|(level, rows)| (level, LevelArena::new(level, rows)))
            .collect();
        Self {
            arenas,
            next_token: 0,
        }
    }

    /// True if any entity, hidden ones included, needs writing
    pub fn has_changes(&self) -> bool {
        self.arenas
            .values()
            .any(|arena| arena.iter().any(|(_, e)| e.is_changed()))
    }

    pub fn arena(&self, level: Level) -> Option<&LevelArena> {
        self.arenas.get(&level)
    }

    /// Arena for `level`, created empty on first use
    pub fn arena_mut(&mut self, level: Level) -> &mut LevelArena {
        self.arenas
            .entry(level)
            .or_insert_with(|| LevelArena::new(level, Vec::new()))
    }

    pub fn entity(&self, level: Level, idx: usize) -> &Entity {
        &self.arenas[&level].entities[idx]
    }

    pub fn allocate_token(&mut self) -> u32 {
        self.next_token += 1;
        self.next_token
    }

    /// Live, not-yet-deleted entity by persisted ID
    pub fn live_persisted(&self, level: Level, id: i64) -> Option<&Entity> {
        let arena = self.arena(level)?;
        let idx = arena.find_by_id(TempId::Persisted(id))?;
        let entity = arena.get(idx);
        entity.is_live().then_some(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stored(id: i64, parent_id: Option<i64>, name: &str, deleted: bool) -> StoredEntity {
        StoredEntity {
            id,
            owner_id: 1,
            parent_id,
            name: name.to_string(),
            sequence: Some(id as i32),
            is_deleted: deleted,
            attrs: AttrMap::new(),
        }
    }

    #[test]
    fn test_name_lookup_ignores_case_and_deleted() {
        let arena = LevelArena::new(
            Level::MainCategory,
            vec![stored(1, None, "Drinks", false), stored(2, None, "Old", true)],
        );
        assert_eq!(arena.find_by_name(ParentKey::Owner(1), " drinks "), Some(0));
        assert_eq!(arena.find_by_name(ParentKey::Owner(1), "old"), None);
        assert_eq!(arena.find_by_name(ParentKey::Owner(2), "drinks"), None);
        assert_eq!(arena.find_by_id(TempId::Persisted(2)), Some(1));
    }

    #[test]
    fn test_child_parent_key() {
        let arena = LevelArena::new(Level::SubCategory, vec![stored(5, Some(1), "Hot", false)]);
        assert_eq!(
            arena.get(0).parent,
            ParentKey::Entity(TempId::Persisted(1))
        );
    }

    #[test]
    fn test_stored_amounts_load_as_decimal_text() {
        let mut item = stored(77, Some(3), "Cola", false);
        item.attrs.insert("price".into(), json!(40.0));
        item.attrs.insert("gst_rate".into(), json!("5.00"));
        item.attrs.insert("serves".into(), json!(2));
        let arena = LevelArena::new(Level::MenuItem, vec![item]);
        assert_eq!(arena.get(0).attrs["price"], json!("40"));
        assert_eq!(arena.get(0).attrs["gst_rate"], json!("5"));
        assert_eq!(arena.get(0).attrs["serves"], json!(2));
    }

    #[test]
    fn test_reindex_after_rename() {
        let mut arena = LevelArena::new(Level::MenuItem, vec![stored(77, Some(3), "Cola", false)]);
        let parent = arena.get(0).parent;
        arena.get_mut(0).name = "Cola Zero".into();
        arena.reindex(0, parent, "Cola");
        assert_eq!(arena.find_by_name(parent, "cola"), None);
        assert_eq!(arena.find_by_name(parent, "Cola Zero"), Some(0));
    }

    #[test]
    fn test_values_equal() {
        assert!(values_equal(&json!(50), &json!(50.0)));
        assert!(values_equal(&json!("12.5"), &json!("12.5")));
        assert!(!values_equal(&json!(50), &json!(50.5)));
        assert!(values_equal(&json!([{"a": 1}]), &json!([{"a": 1.0}])));
        assert!(!values_equal(&json!(null), &json!(0)));
    }

    #[test]
    fn test_set_sequence_marks_modified() {
        let mut arena = LevelArena::new(Level::MainCategory, vec![stored(1, None, "A", false)]);
        arena.get_mut(0).set_sequence(1);
        assert_eq!(arena.get(0).state, EntityState::Unchanged);
        arena.get_mut(0).set_sequence(2);
        assert_eq!(arena.get(0).state, EntityState::Modified);
    }
}
