//! Shared types for the catalog import workspace
//!
//! Wire-level types used by the import engine and its callers:
//! error codes, the unified API response envelope, and the
//! import summary / error report shapes.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use http;
pub use serde::{Deserialize, Serialize};
