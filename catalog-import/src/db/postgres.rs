//! PostgreSQL catalog store
//!
//! Every level maps to one table described by its [`LevelSchema`]. Reads
//! go through `to_jsonb(row)` so one query shape serves all levels; writes
//! bind parallel arrays and expand them with `UNNEST`, one statement per
//! level. Level attributes travel as a `jsonb[]` column and are cast to
//! their column types in SQL.

use async_trait::async_trait;
use serde_json::Value;
use shared::models::Level;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::collections::HashMap;

use super::{AttrMap, CatalogStore, CatalogTx, EntityRow, InsertedRow, StoreError, StoreResult, StoredEntity};
use crate::import::schema::{AttrKind, LevelSchema, level_schema};
use crate::import::slots::{self, WEEKLY_SLOTS, WeeklySlot};

const UNNEST_ROWS: &str = "UNNEST($1::bigint[], $2::bigint[], $3::bigint[], $4::text[], $5::int[], $6::bool[], $7::jsonb[]) \
     AS u(id, owner_id, parent_id, name, sequence, is_deleted, attrs)";

#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    /// Connect and run pending migrations
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Database(format!("migration failed: {e}")))?;
        tracing::info!(max_connections, "Catalog database connected");
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_slots(&self, item_ids: &[i64]) -> StoreResult<HashMap<i64, Vec<WeeklySlot>>> {
        let rows = sqlx::query(
            "SELECT menu_item_id, weekday, slot_num, open_time, close_time FROM menu_item_slot \
             WHERE menu_item_id = ANY($1) ORDER BY menu_item_id, weekday, slot_num",
        )
        .bind(item_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_item: HashMap<i64, Vec<WeeklySlot>> = HashMap::new();
        for row in rows {
            let slot = WeeklySlot {
                weekday: row.try_get::<i16, _>("weekday")? as u8,
                slot_num: row.try_get::<i16, _>("slot_num")? as u8,
                open_time: row.try_get::<i16, _>("open_time")? as u16,
                close_time: row.try_get::<i16, _>("close_time")? as u16,
            };
            by_item.entry(row.try_get("menu_item_id")?).or_default().push(slot);
        }
        Ok(by_item)
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn load_level(&self, level: Level, owner_ids: &[i64]) -> StoreResult<Vec<StoredEntity>> {
        let schema = level_schema(level);
        let sql = format!(
            "SELECT to_jsonb(t) FROM {} t WHERE restaurant_id = ANY($1) ORDER BY id",
            schema.table
        );
        let rows: Vec<Json<Value>> = sqlx::query_scalar(&sql)
            .bind(owner_ids)
            .fetch_all(&self.pool)
            .await?;
        let mut entities = rows
            .iter()
            .map(|row| stored_from_json(schema, &row.0))
            .collect::<StoreResult<Vec<_>>>()?;

        if level == Level::MenuItem && !entities.is_empty() {
            let ids: Vec<i64> = entities.iter().map(|e| e.id).collect();
            let mut by_item = self.load_slots(&ids).await?;
            for entity in &mut entities {
                let item_slots = by_item.remove(&entity.id).unwrap_or_default();
                entity
                    .attrs
                    .insert(WEEKLY_SLOTS.to_string(), slots::slots_to_value(&item_slots));
            }
        }
        Ok(entities)
    }

    async fn begin(&self) -> StoreResult<Box<dyn CatalogTx>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Transaction(e.to_string()))?;
        Ok(Box::new(PgCatalogTx { tx }))
    }
}

struct PgCatalogTx {
    tx: Transaction<'static, Postgres>,
}

/// Column-wise form of a slice of rows, bound as `$1..$7`
struct RowArrays {
    ids: Vec<Option<i64>>,
    owner_ids: Vec<i64>,
    parent_ids: Vec<Option<i64>>,
    names: Vec<String>,
    sequences: Vec<Option<i32>>,
    is_deleted: Vec<bool>,
    attrs: Vec<Json<AttrMap>>,
}

impl RowArrays {
    fn new(rows: &[EntityRow]) -> Self {
        Self {
            ids: rows.iter().map(|r| r.id).collect(),
            owner_ids: rows.iter().map(|r| r.owner_id).collect(),
            parent_ids: rows.iter().map(|r| r.parent_id).collect(),
            names: rows.iter().map(|r| r.name.clone()).collect(),
            sequences: rows.iter().map(|r| r.sequence).collect(),
            is_deleted: rows.iter().map(|r| r.is_deleted).collect(),
            attrs: rows.iter().map(|r| Json(r.attrs.clone())).collect(),
        }
    }
}

macro_rules! bind_rows {
    ($query:expr, $arrays:expr) => {
        $query
            .bind(&$arrays.ids)
            .bind(&$arrays.owner_ids)
            .bind(&$arrays.parent_ids)
            .bind(&$arrays.names)
            .bind(&$arrays.sequences)
            .bind(&$arrays.is_deleted)
            .bind(&$arrays.attrs)
    };
}

#[async_trait]
impl CatalogTx for PgCatalogTx {
    async fn bulk_update(&mut self, level: Level, rows: &[EntityRow]) -> StoreResult<()> {
        let schema = level_schema(level);
        let sql = update_sql(schema);
        let arrays = RowArrays::new(rows);
        let result = bind_rows!(sqlx::query(&sql), arrays)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() != rows.len() as u64 {
            return Err(StoreError::Database(format!(
                "{level}: updated {} of {} rows",
                result.rows_affected(),
                rows.len()
            )));
        }
        Ok(())
    }

    async fn bulk_insert(&mut self, level: Level, rows: &[EntityRow]) -> StoreResult<Vec<InsertedRow>> {
        let schema = level_schema(level);
        let sql = insert_sql(schema);
        let arrays = RowArrays::new(rows);
        let returned = bind_rows!(sqlx::query(&sql), arrays)
            .fetch_all(&mut *self.tx)
            .await?;
        returned
            .iter()
            .map(|row| -> StoreResult<InsertedRow> {
                Ok(InsertedRow {
                    id: row.try_get("id")?,
                    parent_id: row.try_get("parent_id")?,
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }

    async fn replace_weekly_slots(&mut self, item_slots: &[(i64, Vec<WeeklySlot>)]) -> StoreResult<()> {
        let item_ids: Vec<i64> = item_slots.iter().map(|(id, _)| *id).collect();
        sqlx::query("DELETE FROM menu_item_slot WHERE menu_item_id = ANY($1)")
            .bind(&item_ids)
            .execute(&mut *self.tx)
            .await?;

        let flat: Vec<(i64, &WeeklySlot)> = item_slots
            .iter()
            .flat_map(|(id, set)| set.iter().map(move |slot| (*id, slot)))
            .collect();
        if flat.is_empty() {
            return Ok(());
        }
        let ids: Vec<i64> = flat.iter().map(|(id, _)| *id).collect();
        let weekdays: Vec<i16> = flat.iter().map(|(_, s)| i16::from(s.weekday)).collect();
        let slot_nums: Vec<i16> = flat.iter().map(|(_, s)| i16::from(s.slot_num)).collect();
        let opens: Vec<i16> = flat.iter().map(|(_, s)| s.open_time as i16).collect();
        let closes: Vec<i16> = flat.iter().map(|(_, s)| s.close_time as i16).collect();
        sqlx::query(
            "INSERT INTO menu_item_slot (menu_item_id, weekday, slot_num, open_time, close_time) \
             SELECT * FROM UNNEST($1::bigint[], $2::smallint[], $3::smallint[], $4::smallint[], $5::smallint[])",
        )
        .bind(&ids)
        .bind(&weekdays)
        .bind(&slot_nums)
        .bind(&opens)
        .bind(&closes)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| StoreError::Transaction(e.to_string()))
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| StoreError::Transaction(e.to_string()))
    }
}

fn stored_from_json(schema: &LevelSchema, row: &Value) -> StoreResult<StoredEntity> {
    let malformed = |field: &str| StoreError::Database(format!("{}: bad {field} in {row}", schema.table));

    let name = if schema.name_is_id {
        row[schema.name_column].as_i64().map(|id| id.to_string())
    } else {
        row[schema.name_column].as_str().map(str::to_string)
    };
    let attrs: AttrMap = schema
        .column_attributes()
        .map(|spec| (spec.name.to_string(), row[spec.name].clone()))
        .collect();

    Ok(StoredEntity {
        id: row["id"].as_i64().ok_or_else(|| malformed("id"))?,
        owner_id: row["restaurant_id"].as_i64().ok_or_else(|| malformed("restaurant_id"))?,
        parent_id: schema.parent_column.and_then(|c| row[c].as_i64()),
        name: name.ok_or_else(|| malformed(schema.name_column))?,
        sequence: row["sequence"].as_i64().and_then(|s| i32::try_from(s).ok()),
        is_deleted: row["is_deleted"].as_bool().unwrap_or(false),
        attrs,
    })
}

fn attr_expr(name: &str, kind: AttrKind) -> String {
    match kind {
        AttrKind::Text => format!("u.attrs->>'{name}'"),
        AttrKind::Decimal => format!("(u.attrs->>'{name}')::numeric"),
        AttrKind::Int => format!("(u.attrs->>'{name}')::int"),
        AttrKind::Bool => format!("(u.attrs->>'{name}')::boolean"),
        AttrKind::Slots => "NULL".to_string(),
    }
}

fn name_expr(schema: &LevelSchema) -> &'static str {
    if schema.name_is_id { "u.name::bigint" } else { "u.name" }
}

/// `(column, value expression)` pairs written on insert and update
fn write_columns(schema: &LevelSchema) -> Vec<(&'static str, String)> {
    let mut columns = Vec::new();
    if let Some(parent) = schema.parent_column {
        columns.push((parent, "u.parent_id".to_string()));
    }
    columns.push((schema.name_column, name_expr(schema).to_string()));
    if schema.sequenced {
        columns.push(("sequence", "u.sequence".to_string()));
    }
    columns.push(("is_deleted", "u.is_deleted".to_string()));
    for spec in schema.column_attributes() {
        columns.push((spec.name, attr_expr(spec.name, spec.kind)));
    }
    columns
}

fn insert_sql(schema: &LevelSchema) -> String {
    let mut columns = vec!["restaurant_id"];
    let mut values = vec!["u.owner_id".to_string()];
    for (column, value) in write_columns(schema) {
        columns.push(column);
        values.push(value);
    }
    let parent_ret = schema.parent_column.unwrap_or("NULL::bigint");
    let name_ret = if schema.name_is_id {
        format!("{}::text", schema.name_column)
    } else {
        schema.name_column.to_string()
    };
    format!(
        "INSERT INTO {table} ({columns}) SELECT {values} FROM {UNNEST_ROWS} \
         RETURNING id, {parent_ret} AS parent_id, {name_ret} AS name",
        table = schema.table,
        columns = columns.join(", "),
        values = values.join(", "),
    )
}

fn update_sql(schema: &LevelSchema) -> String {
    let assignments: Vec<String> = write_columns(schema)
        .into_iter()
        .map(|(column, value)| format!("{column} = {value}"))
        .chain(std::iter::once("updated_at = now()".to_string()))
        .collect();
    format!(
        "UPDATE {table} AS t SET {assignments} FROM {UNNEST_ROWS} \
         WHERE t.id = u.id AND t.restaurant_id = u.owner_id",
        table = schema.table,
        assignments = assignments.join(", "),
    )
}
