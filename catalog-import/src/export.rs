//! Catalog export
//!
//! Renders stored state in the same tabular schema the importer reads, so a
//! file exported and uploaded again changes nothing. Only live entities are
//! exported, siblings in sequence order. Categories without items cannot be
//! expressed in the menu schema and are left out.

use serde_json::Value;
use shared::models::{ImportKind, Level, RawRow};
use std::collections::{BTreeMap, HashMap};

use crate::db::{self, CatalogStore, StoreResult, StoredEntity};
use crate::import::schema::{AttrKind, import_schema, level_schema};
use crate::import::slots::{self, WEEKDAYS, WEEKLY_SLOTS};
use crate::utils::validation::format_money;

/// Header plus rows aligned to it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ExportTable {
    fn new(kind: ImportKind) -> Self {
        Self {
            columns: import_schema(kind).columns(),
            rows: Vec::new(),
        }
    }

    fn push(&mut self, cells: HashMap<String, String>) {
        let row = self
            .columns
            .iter()
            .map(|c| cells.get(c).cloned().unwrap_or_default())
            .collect();
        self.rows.push(row);
    }

    /// Rows keyed by column, as an upload would arrive
    pub fn to_raw_rows(&self) -> Vec<RawRow> {
        self.rows
            .iter()
            .map(|row| self.columns.iter().cloned().zip(row.iter().cloned()).collect())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub async fn export(
    store: &dyn CatalogStore,
    kind: ImportKind,
    owner_ids: &[i64],
) -> StoreResult<ExportTable> {
    let schema = import_schema(kind);
    let snapshot = db::load_snapshot(store, &schema.snapshot_levels(), owner_ids).await?;
    let tree = Tree::new(snapshot);

    let mut owners = owner_ids.to_vec();
    owners.sort_unstable();
    owners.dedup();

    let mut table = ExportTable::new(kind);
    for owner_id in owners {
        match kind {
            ImportKind::Menu => export_menu(&tree, owner_id, &mut table),
            ImportKind::Addon => export_addons(&tree, owner_id, &mut table),
            ImportKind::ItemAddonGroup => export_mappings(&tree, owner_id, &mut table),
        }
    }
    tracing::info!(kind = %kind, owners = owner_ids.len(), rows = table.len(), "Catalog exported");
    Ok(table)
}

/// Live entities grouped by level and parent, sequence-ordered
struct Tree {
    children: HashMap<(Level, Option<i64>, i64), Vec<StoredEntity>>,
    live: HashMap<Level, BTreeMap<i64, StoredEntity>>,
}

impl Tree {
    fn new(snapshot: HashMap<Level, Vec<StoredEntity>>) -> Self {
        let mut children: HashMap<(Level, Option<i64>, i64), Vec<StoredEntity>> = HashMap::new();
        let mut live: HashMap<Level, BTreeMap<i64, StoredEntity>> = HashMap::new();
        for (level, rows) in snapshot {
            for row in rows.into_iter().filter(|r| !r.is_deleted) {
                live.entry(level).or_default().insert(row.id, row.clone());
                children
                    .entry((level, row.parent_id, row.owner_id))
                    .or_default()
                    .push(row);
            }
        }
        for siblings in children.values_mut() {
            siblings.sort_by_key(|e| (e.sequence.unwrap_or(i32::MAX), e.id));
        }
        Self { children, live }
    }

    fn children(&self, level: Level, parent_id: Option<i64>, owner_id: i64) -> &[StoredEntity] {
        self.children
            .get(&(level, parent_id, owner_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn is_live(&self, level: Level, id: i64) -> bool {
        self.live.get(&level).is_some_and(|rows| rows.contains_key(&id))
    }

    fn live(&self, level: Level) -> impl Iterator<Item = &StoredEntity> {
        self.live.get(&level).into_iter().flat_map(|rows| rows.values())
    }
}

fn attr_cell(level: Level, key: &str, value: &Value) -> String {
    let kind = level_schema(level).attribute(key).map(|a| a.kind);
    match (kind, value) {
        (_, Value::Null) => String::new(),
        (_, Value::Bool(b)) => (if *b { "1" } else { "0" }).to_string(),
        (Some(AttrKind::Decimal), Value::Number(_) | Value::String(_)) => format_money(value),
        (_, Value::String(s)) => s.clone(),
        (_, other) => other.to_string(),
    }
}

/// Attribute cells of `entity`, `column(attr)` naming the target column
fn attr_cells(
    level: Level,
    entity: &StoredEntity,
    column: impl Fn(&str) -> String,
    cells: &mut HashMap<String, String>,
) {
    for spec in level_schema(level).column_attributes() {
        let value = entity.attrs.get(spec.name).unwrap_or(&Value::Null);
        cells.insert(column(spec.name), attr_cell(level, spec.name, value));
    }
}

fn export_menu(tree: &Tree, owner_id: i64, table: &mut ExportTable) {
    let mut token = 0usize;
    for main in tree.children(Level::MainCategory, None, owner_id) {
        for sub in tree.children(Level::SubCategory, Some(main.id), owner_id) {
            for item in tree.children(Level::MenuItem, Some(sub.id), owner_id) {
                token += 1;
                let mut cells = HashMap::from([
                    ("restaurant_id".to_string(), owner_id.to_string()),
                    ("parent".to_string(), format!("i{token}")),
                    ("main_category_id".to_string(), main.id.to_string()),
                    ("main_category_name".to_string(), main.name.clone()),
                    ("menu_item_id".to_string(), item.id.to_string()),
                    ("menu_item_name".to_string(), item.name.clone()),
                    ("is_deleted".to_string(), "0".to_string()),
                ]);
                // The default sub category is implied by blank sub columns
                if !sub.name.is_empty() {
                    cells.insert("sub_category_id".into(), sub.id.to_string());
                    cells.insert("sub_category_name".into(), sub.name.clone());
                }
                attr_cells(Level::MenuItem, item, str::to_string, &mut cells);
                let item_slots = item
                    .attrs
                    .get(WEEKLY_SLOTS)
                    .map(slots::slots_from_value)
                    .unwrap_or_default();
                for slot in item_slots {
                    let Some(day) = WEEKDAYS.get(slot.weekday as usize) else {
                        continue;
                    };
                    cells.insert(slots::open_column(day, slot.slot_num), slots::format_time(slot.open_time));
                    cells.insert(slots::close_column(day, slot.slot_num), slots::format_time(slot.close_time));
                }
                table.push(cells);

                export_variants(tree, owner_id, item.id, token, table);
            }
        }
    }
}

fn export_variants(tree: &Tree, owner_id: i64, item_id: i64, token: usize, table: &mut ExportTable) {
    for group in tree.children(Level::VariantGroup, Some(item_id), owner_id) {
        for variant in tree.children(Level::Variant, Some(group.id), owner_id) {
            let mut cells = HashMap::from([
                ("restaurant_id".to_string(), owner_id.to_string()),
                ("parent".to_string(), format!("v{token}")),
                ("variant_group_id".to_string(), group.id.to_string()),
                ("variant_group_name".to_string(), group.name.clone()),
                ("variant_id".to_string(), variant.id.to_string()),
                ("variant_name".to_string(), variant.name.clone()),
                ("is_deleted".to_string(), "0".to_string()),
            ]);
            attr_cells(Level::Variant, variant, |key| format!("variant_{key}"), &mut cells);
            table.push(cells);
        }
    }
}

fn export_addons(tree: &Tree, owner_id: i64, table: &mut ExportTable) {
    for group in tree.children(Level::AddonGroup, None, owner_id) {
        let mut group_cells = HashMap::from([
            ("restaurant_id".to_string(), owner_id.to_string()),
            ("addon_group_id".to_string(), group.id.to_string()),
            ("addon_group_name".to_string(), group.name.clone()),
            ("is_deleted".to_string(), "0".to_string()),
        ]);
        attr_cells(Level::AddonGroup, group, str::to_string, &mut group_cells);

        let addons = tree.children(Level::Addon, Some(group.id), owner_id);
        if addons.is_empty() {
            table.push(group_cells);
            continue;
        }
        for addon in addons {
            let mut cells = group_cells.clone();
            cells.insert("addon_id".into(), addon.id.to_string());
            cells.insert("addon_name".into(), addon.name.clone());
            attr_cells(Level::Addon, addon, str::to_string, &mut cells);
            table.push(cells);
        }
    }
}

fn export_mappings(tree: &Tree, owner_id: i64, table: &mut ExportTable) {
    let mut mappings: Vec<&StoredEntity> = tree
        .live(Level::ItemAddonGroup)
        .filter(|m| m.owner_id == owner_id)
        .filter(|m| m.parent_id.is_some_and(|item| tree.is_live(Level::MenuItem, item)))
        .filter(|m| {
            m.name
                .parse::<i64>()
                .is_ok_and(|group| tree.is_live(Level::AddonGroup, group))
        })
        .collect();
    mappings.sort_by_key(|m| (m.parent_id, m.id));

    for mapping in mappings {
        let mut cells = HashMap::from([
            ("restaurant_id".to_string(), owner_id.to_string()),
            (
                "menu_item_id".to_string(),
                mapping.parent_id.map(|id| id.to_string()).unwrap_or_default(),
            ),
            ("addon_group_id".to_string(), mapping.name.clone()),
            ("is_deleted".to_string(), "0".to_string()),
        ]);
        attr_cells(Level::ItemAddonGroup, mapping, str::to_string, &mut cells);
        table.push(cells);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AttrMap, MemoryStore};
    use crate::import::slots::WeeklySlot;
    use serde_json::json;

    fn entity(id: i64, parent_id: Option<i64>, name: &str, seq: i32, attrs: AttrMap) -> StoredEntity {
        StoredEntity {
            id,
            owner_id: 1,
            parent_id,
            name: name.to_string(),
            sequence: Some(seq),
            is_deleted: false,
            attrs,
        }
    }

    fn cell<'a>(table: &'a ExportTable, row: usize, column: &str) -> &'a str {
        let idx = table.columns.iter().position(|c| c == column).unwrap();
        &table.rows[row][idx]
    }

    #[tokio::test]
    async fn test_menu_export_tokens_and_order() {
        let store = MemoryStore::new();
        store.insert_entity(Level::MainCategory, entity(1, None, "Mains", 1, AttrMap::new()));
        store.insert_entity(Level::SubCategory, entity(2, Some(1), "", 1, AttrMap::new()));
        let price = |p: Value| AttrMap::from([("price".to_string(), p), ("in_stock".to_string(), json!(true))]);
        store.insert_entity(Level::MenuItem, entity(11, Some(2), "Pasta", 2, price(json!(90))));
        store.insert_entity(Level::MenuItem, entity(10, Some(2), "Pizza", 1, price(json!("120.50"))));
        store.insert_entity(Level::VariantGroup, entity(20, Some(10), "Size", 1, AttrMap::new()));
        store.insert_entity(
            Level::Variant,
            entity(30, Some(20), "Large", 1, AttrMap::from([("is_default".to_string(), json!(true))])),
        );
        store.set_weekly_slots(
            10,
            vec![WeeklySlot {
                weekday: 1,
                slot_num: 1,
                open_time: 900,
                close_time: 1200,
            }],
        );

        let table = export(&store, ImportKind::Menu, &[1]).await.unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(cell(&table, 0, "parent"), "i1");
        assert_eq!(cell(&table, 0, "menu_item_name"), "Pizza");
        assert_eq!(cell(&table, 0, "price"), "120.5");
        assert_eq!(cell(&table, 0, "in_stock"), "1");
        assert_eq!(cell(&table, 0, "sub_category_name"), "");
        assert_eq!(cell(&table, 0, "tue_open_1"), "0900");
        assert_eq!(cell(&table, 1, "parent"), "v1");
        assert_eq!(cell(&table, 1, "variant_is_default"), "1");
        assert_eq!(cell(&table, 2, "parent"), "i2");
        assert_eq!(cell(&table, 2, "menu_item_name"), "Pasta");
        assert_eq!(cell(&table, 2, "price"), "90");
    }

    #[tokio::test]
    async fn test_addon_export_keeps_empty_groups() {
        let store = MemoryStore::new();
        store.insert_entity(Level::AddonGroup, entity(1, None, "Sauces", 1, AttrMap::new()));
        store.insert_entity(Level::AddonGroup, entity(2, None, "Empty", 2, AttrMap::new()));
        store.insert_entity(Level::Addon, entity(3, Some(1), "Mayo", 1, AttrMap::new()));
        let mut gone = entity(4, Some(1), "Ketchup", 2, AttrMap::new());
        gone.is_deleted = true;
        store.insert_entity(Level::Addon, gone);

        let table = export(&store, ImportKind::Addon, &[1]).await.unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(cell(&table, 0, "addon_name"), "Mayo");
        assert_eq!(cell(&table, 1, "addon_group_name"), "Empty");
        assert_eq!(cell(&table, 1, "addon_name"), "");
    }

    #[tokio::test]
    async fn test_other_restaurants_not_exported() {
        let store = MemoryStore::new();
        let mut other = entity(1, None, "Theirs", 1, AttrMap::new());
        other.owner_id = 2;
        store.insert_entity(Level::AddonGroup, other);
        let table = export(&store, ImportKind::Addon, &[1]).await.unwrap();
        assert!(table.is_empty());
    }
}
