//! 导入流水线
//!
//! ```text
//! RawRow ─▶ normalize ─▶ resolve ─▶ sequence ─▶ conflict ─▶ writer ─▶ notify
//!            (行隔离)      (快照)                  (批级)      (单事务)
//! ```
//!
//! 同一引擎按 [`schema::ImportSchema`] 参数化，覆盖菜单、加料、加料映射三种导入。

pub mod cells;
pub mod conflict;
pub mod entity;
pub mod kinds;
pub mod normalize;
pub mod notify;
pub mod pipeline;
pub mod resolve;
pub mod row;
pub mod schema;
pub mod sequence;
pub mod slots;
pub mod tabular;
pub mod writer;

pub use pipeline::CatalogImporter;
pub use schema::template;
pub use tabular::{render_csv, rows_from_csv};
