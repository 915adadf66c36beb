//! Import orchestration
//!
//! normalize → snapshot → resolve → sequence → conflicts → write → notify.
//! Any row issue stops the batch before a transaction is opened.

use shared::models::{ImportKind, ImportMode, ImportRequest, ImportSummary, RawRow};
use std::collections::BTreeSet;
use std::sync::Arc;

use super::conflict::detect_conflicts;
use super::entity::{EntityState, ResolvedBatch};
use super::normalize::normalize;
use super::notify::{collect_leaf_changes, notify};
use super::resolve::resolve;
use super::row::RowRecord;
use super::schema::{ImportSchema, import_schema};
use super::sequence::assign_sequences;
use super::tabular::rows_from_csv;
use super::writer::write_batch;
use crate::db::{self, CatalogStore};
use crate::export::{self, ExportTable};
use crate::services::{FileStore, SearchIndex};
use crate::utils::{ImportError, ImportResult};

/// Resolved batch that passed every check
struct Prepared {
    schema: &'static ImportSchema,
    batch: ResolvedBatch,
    records: Vec<RowRecord>,
    owners: Vec<i64>,
}

#[derive(Clone)]
pub struct CatalogImporter {
    store: Arc<dyn CatalogStore>,
    search_index: Arc<dyn SearchIndex>,
}

impl CatalogImporter {
    pub fn new(store: Arc<dyn CatalogStore>, search_index: Arc<dyn SearchIndex>) -> Self {
        Self {
            store,
            search_index,
        }
    }

    /// Reconcile the batch with the store and commit it atomically
    pub async fn import(&self, kind: ImportKind, request: &ImportRequest) -> ImportResult<ImportSummary> {
        let mut prepared = self.prepare(kind, request).await?;
        let summary = summarize(prepared.schema, &prepared.batch);

        // Hidden entities are not in the summary but may still need writing
        if !prepared.batch.has_changes() {
            tracing::info!(kind = %kind, rows = request.rows.len(), "Import matched stored catalog, nothing to write");
            commit_records(&mut prepared.records);
            return Ok(summary);
        }

        let remap = write_batch(self.store.as_ref(), prepared.schema, &prepared.batch)
            .await
            .map_err(ImportError::WriteFailed)?;
        commit_records(&mut prepared.records);

        let (created, modified) = totals(&summary);
        tracing::info!(
            kind = %kind,
            rows = request.rows.len(),
            created,
            modified,
            "Import committed"
        );
        crate::audit_log!(kind, prepared.owners, created, modified);

        let changes = collect_leaf_changes(prepared.schema, &prepared.batch, &remap);
        notify(self.search_index.as_ref(), &changes).await;

        Ok(summary)
    }

    /// Dry run: every check, the would-be summary, no transaction
    pub async fn validate(&self, kind: ImportKind, request: &ImportRequest) -> ImportResult<ImportSummary> {
        let prepared = self.prepare(kind, request).await?;
        let summary = summarize(prepared.schema, &prepared.batch);
        tracing::info!(kind = %kind, rows = request.rows.len(), "Import validated");
        Ok(summary)
    }

    /// Import a staged CSV upload
    pub async fn import_file(
        &self,
        files: &dyn FileStore,
        kind: ImportKind,
        reference: &str,
        mode: ImportMode,
    ) -> ImportResult<ImportSummary> {
        let request = self.read_upload(files, reference, mode).await?;
        self.import(kind, &request).await
    }

    /// Dry run of a staged CSV upload
    pub async fn validate_file(
        &self,
        files: &dyn FileStore,
        kind: ImportKind,
        reference: &str,
        mode: ImportMode,
    ) -> ImportResult<ImportSummary> {
        let request = self.read_upload(files, reference, mode).await?;
        self.validate(kind, &request).await
    }

    pub async fn export(&self, kind: ImportKind, owner_ids: &[i64]) -> ImportResult<ExportTable> {
        export::export(self.store.as_ref(), kind, owner_ids)
            .await
            .map_err(ImportError::Snapshot)
    }

    async fn read_upload(
        &self,
        files: &dyn FileStore,
        reference: &str,
        mode: ImportMode,
    ) -> ImportResult<ImportRequest> {
        let bytes = files.get_file_contents(reference).await?;
        let rows: Vec<RawRow> = rows_from_csv(&bytes)?;
        Ok(ImportRequest { rows, mode })
    }

    async fn prepare(&self, kind: ImportKind, request: &ImportRequest) -> ImportResult<Prepared> {
        let schema = import_schema(kind);
        let normalized = normalize(schema, &request.rows)?;
        let mut records = normalized.records;
        let mut report = normalized.report;

        let owners: Vec<i64> = records
            .iter()
            .filter(|r| r.is_active())
            .filter_map(|r| r.row.as_ref().map(|row| row.owner_id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let snapshot = db::load_snapshot(self.store.as_ref(), &schema.snapshot_levels(), &owners)
            .await
            .map_err(ImportError::Snapshot)?;
        let mut batch = ResolvedBatch::new(snapshot);

        resolve(schema, &mut batch, &mut records, &mut report);
        assign_sequences(schema, &mut batch, &records, request.mode.is_partial);
        detect_conflicts(schema, &batch, &mut records, &mut report);

        if !report.is_empty() || records.iter().any(RowRecord::is_rejected) {
            tracing::warn!(
                kind = %kind,
                rows = request.rows.len(),
                rejected = report.row_count(),
                issues = report.issue_count(),
                "Import rejected"
            );
            return Err(ImportError::Rejected(report));
        }

        Ok(Prepared {
            schema,
            batch,
            records,
            owners,
        })
    }
}

/// Per-level counts of the batch's effect, hidden entities excluded
fn summarize(schema: &ImportSchema, batch: &ResolvedBatch) -> ImportSummary {
    let mut summary = ImportSummary::default();
    for &level in schema.levels {
        let Some(arena) = batch.arena(level) else {
            continue;
        };
        for (_, entity) in arena.iter().filter(|(_, e)| !e.is_hidden()) {
            match entity.state {
                EntityState::Created => summary.record_created(level),
                EntityState::Modified => summary.record_modified(level),
                EntityState::Unchanged | EntityState::Conflicted => {}
            }
        }
    }
    summary
}

fn totals(summary: &ImportSummary) -> (usize, usize) {
    summary
        .levels
        .values()
        .fold((0, 0), |(c, m), s| (c + s.created, m + s.modified))
}

fn commit_records(records: &mut [RowRecord]) {
    for record in records {
        record.mark_committed();
    }
}
