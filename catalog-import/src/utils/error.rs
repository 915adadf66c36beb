//! 导入错误处理
//!
//! 流水线内部使用 [`ImportError`]，对外统一转换为 [`AppError`]：
//!
//! | 变体 | 错误码 |
//! |------|--------|
//! | ColumnMismatch | 6001 |
//! | Rejected (行校验) | 6002 |
//! | Rejected (冲突) | 6003 |
//! | WriteFailed | 6004 |
//! | Empty | 6005 |
//! | Snapshot | 9002 |

use serde_json::json;
use shared::models::ImportErrorReport;
use shared::{AppError, ErrorCode};
use thiserror::Error;

use crate::db::StoreError;
use crate::services::FileStoreError;

/// Import pipeline error
#[derive(Debug, Error)]
pub enum ImportError {
    /// Header set differs from the schema; nothing was read
    #[error("Column mismatch (missing: {missing:?}, extra: {extra:?})")]
    ColumnMismatch {
        missing: Vec<String>,
        extra: Vec<String>,
    },

    #[error("Import contains no data rows")]
    Empty,

    /// Row validation or resolution conflicts; nothing was written
    #[error("{} row(s) rejected", .0.row_count())]
    Rejected(ImportErrorReport),

    #[error("Failed to load catalog snapshot: {0}")]
    Snapshot(#[source] StoreError),

    /// Transaction rolled back
    #[error("Import failed, no changes applied: {0}")]
    WriteFailed(#[source] StoreError),

    #[error("Malformed CSV: {0}")]
    Csv(String),

    #[error(transparent)]
    Upload(#[from] FileStoreError),
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::Csv(err.to_string())
    }
}

impl ImportError {
    /// Row report, if this is a row-level failure
    pub fn report(&self) -> Option<&ImportErrorReport> {
        match self {
            ImportError::Rejected(report) => Some(report),
            _ => None,
        }
    }
}

impl From<ImportError> for AppError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::ColumnMismatch { missing, extra } => {
                AppError::new(ErrorCode::ImportColumnMismatch)
                    .with_detail("missing", json!(missing))
                    .with_detail("extra", json!(extra))
            }
            ImportError::Empty => AppError::new(ErrorCode::ImportEmpty),
            ImportError::Rejected(report) => {
                let code = if report
                    .errors
                    .values()
                    .flatten()
                    .any(|issue| issue.error_kind.is_conflict())
                {
                    ErrorCode::ImportConflict
                } else {
                    ErrorCode::ImportRowsRejected
                };
                let errors = serde_json::to_value(&report.errors).unwrap_or_default();
                AppError::new(code).with_detail("errors", errors)
            }
            ImportError::Snapshot(e) => AppError::database(e.to_string()),
            ImportError::WriteFailed(e) => {
                AppError::new(ErrorCode::ImportFailed).with_detail("cause", e.to_string())
            }
            ImportError::Csv(msg) => AppError::with_message(ErrorCode::InvalidFormat, msg),
            ImportError::Upload(FileStoreError::NotFound(reference)) => {
                AppError::new(ErrorCode::UploadNotFound).with_detail("reference", reference)
            }
            ImportError::Upload(e) => {
                AppError::with_message(ErrorCode::UploadUnreadable, e.to_string())
            }
        }
    }
}

/// Result alias for the import pipeline
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use shared::models::{ErrorKind, RowIssue};

    #[test]
    fn test_rejected_rows_map_to_validation_code() {
        let mut report = ImportErrorReport::default();
        report.push(0, RowIssue::new("price", ErrorKind::InvalidNumber, "abc"));

        let app: AppError = ImportError::Rejected(report).into();
        assert_eq!(app.code, ErrorCode::ImportRowsRejected);
        assert_eq!(app.http_status(), StatusCode::BAD_REQUEST);
        let details = app.details.unwrap();
        assert_eq!(details["errors"]["2"][0]["column_name"], "price");
    }

    #[test]
    fn test_conflict_rows_map_to_conflict_code() {
        let mut report = ImportErrorReport::default();
        report.push(1, RowIssue::new("price", ErrorKind::InvalidNumber, "abc"));
        report.push(
            3,
            RowIssue::new("variant_is_default", ErrorKind::MultipleDefaults, "Large"),
        );

        let app: AppError = ImportError::Rejected(report).into();
        assert_eq!(app.code, ErrorCode::ImportConflict);
    }

    #[test]
    fn test_write_failure_is_server_error() {
        let app: AppError =
            ImportError::WriteFailed(StoreError::Database("connection reset".into())).into();
        assert_eq!(app.code, ErrorCode::ImportFailed);
        assert_eq!(app.message, "Import failed, no changes applied");
        assert_eq!(app.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_column_mismatch_details() {
        let app: AppError = ImportError::ColumnMismatch {
            missing: vec!["price".into()],
            extra: vec!["cost".into()],
        }
        .into();
        assert_eq!(app.code, ErrorCode::ImportColumnMismatch);
        let details = app.details.unwrap();
        assert_eq!(details["missing"], json!(["price"]));
        assert_eq!(details["extra"], json!(["cost"]));
    }
}
