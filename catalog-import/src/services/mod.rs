//! 外部协作服务
//!
//! # 服务列表
//!
//! - [`SearchIndex`] - 搜索索引通知 (HTTP / no-op)
//! - [`FileStore`] - 上传文件读取 (本地目录)

pub mod file_store;
pub mod search_index;

pub use file_store::{FileStore, FileStoreError, LocalFileStore};
pub use search_index::{HttpSearchIndex, IndexCall, NoopSearchIndex, NotifyError, RecordingSearchIndex, SearchIndex};
