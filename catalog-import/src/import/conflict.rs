//! Conflict Detector
//!
//! Batch-level checks over the resolved snapshot. Findings are attached to
//! the rows responsible and reject them, which fails the whole batch.

use serde_json::Value;
use shared::models::{ErrorKind, ImportErrorReport, Level, RowIssue};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::entity::{ParentKey, ResolvedBatch, TempId, name_key};
use super::row::RowRecord;
use super::schema::ImportSchema;

pub fn detect_conflicts(
    schema: &ImportSchema,
    batch: &ResolvedBatch,
    records: &mut [RowRecord],
    report: &mut ImportErrorReport,
) {
    let mut findings: Vec<(usize, RowIssue)> = Vec::new();
    for &level in schema.levels {
        duplicate_names(batch, records, level, &mut findings);
    }
    if schema.resolves(Level::Variant) {
        default_variants(batch, records, &mut findings);
    }

    for (index, issue) in findings {
        report.push(index, issue);
        records[index].reject();
    }
}

/// Two live entities of one scope may not share a name
fn duplicate_names(
    batch: &ResolvedBatch,
    records: &[RowRecord],
    level: Level,
    findings: &mut Vec<(usize, RowIssue)>,
) {
    let Some(arena) = batch.arena(level) else {
        return;
    };

    let mut groups: HashMap<(ParentKey, String), Vec<usize>> = HashMap::new();
    for (idx, entity) in arena.iter().filter(|(_, e)| e.is_live()) {
        groups
            .entry((entity.parent, name_key(&entity.name)))
            .or_default()
            .push(idx);
    }

    for members in groups.values().filter(|m| m.len() > 1) {
        // Pre-existing duplicates the batch did not touch are left alone
        for &idx in members {
            let entity = arena.get(idx);
            if !entity.is_changed() {
                continue;
            }
            let Some(row) = entity.claimed_by else {
                continue;
            };
            let column = records[row]
                .row
                .as_ref()
                .and_then(|r| r.draft(level))
                .map(|d| d.name_column)
                .unwrap_or("name");
            findings.push((
                row,
                RowIssue::new(
                    column,
                    ErrorKind::DuplicateName,
                    format!("{level} '{}' already exists under the same parent", entity.name),
                ),
            ));
        }
    }
}

/// Every touched Variant Group with live variants has exactly one default
fn default_variants(
    batch: &ResolvedBatch,
    records: &[RowRecord],
    findings: &mut Vec<(usize, RowIssue)>,
) {
    let Some(variants) = batch.arena(Level::Variant) else {
        return;
    };

    // group → rows that resolved a variant in it
    let mut touched: BTreeMap<TempId, BTreeSet<usize>> = BTreeMap::new();
    for record in records.iter().filter(|r| !r.is_rejected()) {
        if let Some(idx) = record.resolved_at(Level::Variant)
            && let ParentKey::Entity(group) = variants.get(idx).parent
        {
            touched.entry(group).or_default().insert(record.index);
        }
    }

    let mut defaults: HashMap<TempId, (usize, usize)> = HashMap::new();
    for (_, variant) in variants.iter().filter(|(_, v)| v.is_live()) {
        if let ParentKey::Entity(group) = variant.parent {
            let counts = defaults.entry(group).or_insert((0, 0));
            counts.0 += 1;
            if variant.attr("is_default") == &Value::Bool(true) {
                counts.1 += 1;
            }
        }
    }

    for (group, rows) in touched {
        let (live, default_count) = defaults.get(&group).copied().unwrap_or((0, 0));
        if live == 0 {
            continue;
        }
        let group_name = batch
            .arena(Level::VariantGroup)
            .and_then(|a| a.find_by_id(group).map(|idx| a.get(idx).name.clone()))
            .unwrap_or_default();
        let (kind, details) = match default_count {
            1 => continue,
            0 => (
                ErrorKind::NoDefault,
                format!("variant group '{group_name}' has no default variant"),
            ),
            n => (
                ErrorKind::MultipleDefaults,
                format!("variant group '{group_name}' has {n} default variants"),
            ),
        };
        for row in rows {
            findings.push((row, RowIssue::new("variant_is_default", kind, details.clone())));
        }
    }
}
