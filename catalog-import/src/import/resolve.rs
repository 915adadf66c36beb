//! Hierarchy Resolver
//!
//! Level by level, parent-to-child, every active row locates (or creates)
//! the entity its draft describes in the batch snapshot. The first row to
//! address an entity claims it; a later row asking for a different result
//! is a conflict.

use serde_json::Value;
use shared::models::{ErrorKind, ImportErrorReport, Level, RowIssue};
use shared::util::row_label;

use super::entity::{Entity, EntityState, ParentKey, ResolvedBatch, TempId, values_equal};
use super::row::{Anchor, EntityDraft, RowRecord};
use super::schema::{ImportSchema, level_schema};

/// Pending edits of one row against one entity
#[derive(Debug, Default)]
struct Changes {
    name: Option<String>,
    parent: Option<ParentKey>,
    attrs: Vec<(String, Value)>,
    is_deleted: Option<bool>,
}

impl Changes {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.parent.is_none()
            && self.attrs.is_empty()
            && self.is_deleted.is_none()
    }
}

fn conflict_kind(level: Level) -> ErrorKind {
    match level {
        Level::ItemAddonGroup => ErrorKind::MappingConflict,
        _ => ErrorKind::MultipleUpdates,
    }
}

pub fn resolve(
    schema: &ImportSchema,
    batch: &mut ResolvedBatch,
    records: &mut [RowRecord],
    report: &mut ImportErrorReport,
) {
    check_references(batch, records, report);

    for &level in schema.levels {
        for index in 0..records.len() {
            if !records[index].is_active() {
                continue;
            }
            match resolve_row(batch, records, index, level) {
                Ok(Some(idx)) => records[index].resolved.push((level, idx)),
                Ok(None) => {}
                Err(issue) => {
                    report.push(index, issue);
                    records[index].reject();
                }
            }
        }
    }

    for record in records.iter_mut() {
        record.mark_resolved();
    }
}

/// Referenced (not modified) entities must be live and belong to the row's restaurant
fn check_references(batch: &ResolvedBatch, records: &mut [RowRecord], report: &mut ImportErrorReport) {
    for record in records.iter_mut().filter(|r| r.is_active()) {
        let Some(row) = record.row.as_ref() else {
            continue;
        };
        let issues: Vec<RowIssue> = row
            .references
            .iter()
            .filter(|r| {
                !batch
                    .live_persisted(r.level, r.id)
                    .is_some_and(|e| e.owner_id == row.owner_id)
            })
            .map(|r| {
                RowIssue::new(
                    r.column,
                    ErrorKind::InvalidReference,
                    format!("no live {} with id {} in restaurant {}", r.level, r.id, row.owner_id),
                )
            })
            .collect();

        if !issues.is_empty() {
            for issue in issues {
                report.push(record.index, issue);
            }
            record.reject();
        }
    }
}

/// Resolve the row's draft at `level`; `Ok(None)` when the row has none
fn resolve_row(
    batch: &mut ResolvedBatch,
    records: &[RowRecord],
    index: usize,
    level: Level,
) -> Result<Option<usize>, RowIssue> {
    let Some(row) = records[index].row.as_ref() else {
        return Ok(None);
    };
    let Some(pos) = row.position(level) else {
        return Ok(None);
    };
    let draft = &row.drafts[pos];
    let owner_id = row.owner_id;

    let parent = if pos == 0 {
        anchor_parent(batch, records, &row.anchor, owner_id)?
    } else {
        let prev_level = row.drafts[pos - 1].level;
        let prev_idx = records[index].resolved_at(prev_level).ok_or_else(|| {
            RowIssue::new(
                draft.key_column(),
                ErrorKind::InvalidParent,
                format!("{prev_level} of this row could not be resolved"),
            )
        })?;
        Some(ParentKey::Entity(batch.entity(prev_level, prev_idx).id))
    };

    let deleting = draft.is_deleted == Some(true);

    if let Some(id) = draft.id {
        let found = batch
            .arena(level)
            .and_then(|a| a.find_by_id(TempId::Persisted(id)));
        // Deleting what is already deleted is a no-op
        if deleting
            && let Some(idx) = found
            && !batch.entity(level, idx).is_live()
            && batch.entity(level, idx).owner_id == owner_id
        {
            return Ok(Some(idx));
        }
        let idx = found
            .filter(|&idx| {
                let entity = batch.entity(level, idx);
                entity.is_live() && entity.owner_id == owner_id
            })
            .ok_or_else(|| {
                RowIssue::new(
                    draft.id_column,
                    ErrorKind::InvalidReference,
                    format!("no live {level} with id {id} in restaurant {owner_id}"),
                )
            })?;
        apply(batch, level, idx, draft, parent, true, index)?;
        return Ok(Some(idx));
    }

    let Some(parent) = parent else {
        return Err(RowIssue::new(
            draft.key_column(),
            ErrorKind::InvalidParent,
            format!("{level} without an id needs its parent columns"),
        ));
    };
    let name = draft.name.as_deref().unwrap_or("").trim();

    let found = batch.arena(level).and_then(|a| a.find_by_name(parent, name));
    match found {
        Some(idx) => {
            apply(batch, level, idx, draft, Some(parent), false, index)?;
            Ok(Some(idx))
        }
        None if deleting => batch
            .arena(level)
            .and_then(|a| a.find_deleted_by_name(parent, name))
            .map(Some)
            .ok_or_else(|| {
                RowIssue::new(
                    draft.name_column,
                    ErrorKind::InvalidReference,
                    format!("cannot delete: no {level} named '{name}'"),
                )
            }),
        None => Ok(Some(create(batch, level, draft, parent, owner_id, name, index))),
    }
}

fn anchor_parent(
    batch: &ResolvedBatch,
    records: &[RowRecord],
    anchor: &Anchor,
    owner_id: i64,
) -> Result<Option<ParentKey>, RowIssue> {
    match anchor {
        Anchor::Owner => Ok(Some(ParentKey::Owner(owner_id))),
        Anchor::Keep => Ok(None),
        Anchor::ParentRow { row, parent_level } => {
            let parent_record = &records[*row];
            match parent_record.resolved_at(*parent_level) {
                Some(pidx) if !parent_record.is_rejected() => Ok(Some(ParentKey::Entity(
                    batch.entity(*parent_level, pidx).id,
                ))),
                _ => Err(RowIssue::new(
                    "parent",
                    ErrorKind::InvalidParent,
                    format!("parent row {} was rejected", row_label(*row)),
                )),
            }
        }
        Anchor::Existing { level, id, column } => batch
            .live_persisted(*level, *id)
            .filter(|e| e.owner_id == owner_id)
            .map(|_| Some(ParentKey::Entity(TempId::Persisted(*id))))
            .ok_or_else(|| {
                RowIssue::new(
                    *column,
                    ErrorKind::InvalidReference,
                    format!("no live {level} with id {id} in restaurant {owner_id}"),
                )
            }),
        Anchor::Unlinked => Err(RowIssue::new(
            "parent",
            ErrorKind::ParentNotFound,
            "parent row not found",
        )),
    }
}

fn create(
    batch: &mut ResolvedBatch,
    level: Level,
    draft: &EntityDraft,
    parent: ParentKey,
    owner_id: i64,
    name: &str,
    index: usize,
) -> usize {
    let mut attrs: crate::db::AttrMap = level_schema(level)
        .attributes
        .iter()
        .map(|a| (a.name.to_string(), a.default.value()))
        .collect();
    attrs.extend(draft.attrs.clone());

    let token = batch.allocate_token();
    let entity = Entity {
        id: TempId::Pending(token),
        owner_id,
        parent,
        stored_parent: None,
        name: name.to_string(),
        sequence: None,
        stored_sequence: None,
        is_deleted: false,
        attrs,
        state: EntityState::Created,
        claimed_by: Some(index),
        dirty: draft.attrs.keys().cloned().collect(),
    };
    batch.arena_mut(level).push(entity)
}

/// Diff the draft against the entity and apply it, or report a conflict
fn apply(
    batch: &mut ResolvedBatch,
    level: Level,
    idx: usize,
    draft: &EntityDraft,
    parent: Option<ParentKey>,
    by_id: bool,
    index: usize,
) -> Result<(), RowIssue> {
    let arena = batch.arena_mut(level);
    let entity = arena.get(idx);

    let mut changes = Changes::default();
    // A name match is not a rename, only an ID match can change the name
    if by_id
        && let Some(name) = draft.name.as_deref().map(str::trim)
        && name != entity.name
    {
        changes.name = Some(name.to_string());
    }
    if let Some(parent) = parent
        && parent != entity.parent
    {
        changes.parent = Some(parent);
    }
    for (key, value) in &draft.attrs {
        if !values_equal(entity.attr(key), value) {
            changes.attrs.push((key.clone(), value.clone()));
        }
    }
    if let Some(deleted) = draft.is_deleted
        && deleted != entity.is_deleted
    {
        changes.is_deleted = Some(deleted);
    }

    let claimed_elsewhere = entity.claimed_by.filter(|&other| other != index);
    if entity.state == EntityState::Conflicted || (claimed_elsewhere.is_some() && !changes.is_empty()) {
        let details = match claimed_elsewhere {
            Some(other) => format!(
                "{level} '{}' is also updated by row {} with different values",
                entity.name,
                row_label(other)
            ),
            None => format!("{level} '{}' has conflicting updates", entity.name),
        };
        arena.get_mut(idx).state = EntityState::Conflicted;
        return Err(RowIssue::new(draft.key_column(), conflict_kind(level), details));
    }
    if claimed_elsewhere.is_some() {
        return Ok(());
    }

    let old_parent = entity.parent;
    let old_name = entity.name.clone();
    let rekey = changes.name.is_some() || changes.parent.is_some() || changes.is_deleted.is_some();
    let changed = !changes.is_empty();

    let entity = arena.get_mut(idx);
    entity.claimed_by = Some(index);
    if let Some(name) = changes.name {
        entity.name = name;
    }
    if let Some(parent) = changes.parent {
        entity.parent = parent;
    }
    for (key, value) in changes.attrs {
        entity.dirty.insert(key.clone());
        entity.attrs.insert(key, value);
    }
    if let Some(deleted) = changes.is_deleted {
        entity.is_deleted = deleted;
    }
    if changed {
        entity.mark_modified();
    }
    if rekey {
        arena.reindex(idx, old_parent, &old_name);
    }
    Ok(())
}
