//! Row Normalizer
//!
//! Header check (fatal) → per-row coercion (row-isolated) → parent-token
//! linking for the menu schema.

use shared::models::{ErrorKind, ImportErrorReport, ImportKind, Level, RawRow, RowIssue};
use std::collections::{BTreeSet, HashMap};

use super::cells::Cells;
use super::kinds::{self, menu};
use super::row::{Anchor, ParentToken, RowRecord};
use super::schema::ImportSchema;
use crate::utils::{ImportError, ImportResult};

/// Output of the normalizer: one record per input row plus collected issues
#[derive(Debug)]
pub struct Normalized {
    pub records: Vec<RowRecord>,
    pub report: ImportErrorReport,
}

impl Normalized {
    pub fn rejected_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_rejected()).count()
    }
}

/// Every row must carry exactly the schema's columns
pub fn check_columns(schema: &ImportSchema, rows: &[RawRow]) -> ImportResult<()> {
    let expected = schema.columns();
    let expected_set: BTreeSet<&str> = expected.iter().map(String::as_str).collect();

    let mut missing: BTreeSet<&str> = BTreeSet::new();
    let mut extra: BTreeSet<&str> = BTreeSet::new();
    for row in rows {
        missing.extend(
            expected_set
                .iter()
                .copied()
                .filter(|c| !row.contains_key(*c)),
        );
        extra.extend(
            row.keys()
                .map(String::as_str)
                .filter(|k| !expected_set.contains(k)),
        );
    }

    if missing.is_empty() && extra.is_empty() {
        return Ok(());
    }
    Err(ImportError::ColumnMismatch {
        // template order reads better than alphabetical
        missing: expected
            .iter()
            .filter(|c| missing.contains(c.as_str()))
            .cloned()
            .collect(),
        extra: extra.into_iter().map(str::to_string).collect(),
    })
}

pub fn normalize(schema: &ImportSchema, rows: &[RawRow]) -> ImportResult<Normalized> {
    if rows.is_empty() {
        return Err(ImportError::Empty);
    }
    check_columns(schema, rows)?;

    let mut report = ImportErrorReport::default();
    let mut records = Vec::with_capacity(rows.len());
    for (index, raw) in rows.iter().enumerate() {
        let mut record = RowRecord::pending(index);
        let mut cells = Cells::new(raw);
        match kinds::shape(schema.kind, &mut cells) {
            Some(row) => record.validated(row),
            None => {
                for issue in cells.into_issues() {
                    report.push(index, issue);
                }
                record.reject();
            }
        }
        records.push(record);
    }

    if schema.kind == ImportKind::Menu {
        link_parent_tokens(rows, &mut records, &mut report);
    }

    let normalized = Normalized { records, report };
    tracing::debug!(
        kind = %schema.kind,
        rows = rows.len(),
        rejected = normalized.rejected_count(),
        "Rows normalized"
    );
    Ok(normalized)
}

/// Attach every `v<token>` row to the `i<token>` row it names
fn link_parent_tokens(rows: &[RawRow], records: &mut [RowRecord], report: &mut ImportErrorReport) {
    // Tokens come from the raw cells so rejected item rows still claim theirs
    let mut item_rows: HashMap<String, usize> = HashMap::new();
    for (index, raw) in rows.iter().enumerate() {
        let parent = raw.get("parent").map(|v| v.trim()).unwrap_or("");
        let Some(ParentToken::Item(token)) = menu::parse_token(parent) else {
            continue;
        };
        if let Some(&first) = item_rows.get(&token) {
            let details = format!(
                "token i{token} already used by row {}",
                shared::util::row_label(first)
            );
            report.push(
                index,
                RowIssue::new("parent", ErrorKind::DuplicateParent, details),
            );
            records[index].reject();
        } else {
            item_rows.insert(token, index);
        }
    }

    for index in 0..records.len() {
        let Some(row) = records[index].row.as_ref() else {
            continue;
        };
        if records[index].is_rejected() {
            continue;
        }
        let Some(ParentToken::Variant(token)) = row.token.clone() else {
            continue;
        };
        let owner_id = row.owner_id;

        let issue = match item_rows.get(&token) {
            None => Some(RowIssue::new(
                "parent",
                ErrorKind::ParentNotFound,
                format!("no item row with token i{token}"),
            )),
            Some(&parent) if records[parent].is_rejected() => Some(RowIssue::new(
                "parent",
                ErrorKind::InvalidParent,
                format!(
                    "item row {} for token i{token} was rejected",
                    shared::util::row_label(parent)
                ),
            )),
            Some(&parent) => {
                let parent_owner = records[parent].row.as_ref().map(|r| r.owner_id);
                if parent_owner != Some(owner_id) {
                    Some(RowIssue::new(
                        "restaurant_id",
                        ErrorKind::InvalidParent,
                        format!(
                            "item row {} belongs to a different restaurant",
                            shared::util::row_label(parent)
                        ),
                    ))
                } else {
                    if let Some(row) = records[index].row.as_mut() {
                        row.anchor = Anchor::ParentRow {
                            row: parent,
                            parent_level: Level::MenuItem,
                        };
                    }
                    None
                }
            }
        };

        if let Some(issue) = issue {
            report.push(index, issue);
            records[index].reject();
        }
    }
}
