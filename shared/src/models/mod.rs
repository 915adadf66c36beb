//! Data models
//!
//! Wire types shared between the import engine and its callers.

pub mod catalog;

// Re-exports
pub use catalog::*;
