//! Catalog Import - 餐厅菜单批量导入引擎
//!
//! # 架构概述
//!
//! 将上传的表格快照与已存储的目录进行对账，计算最小的插入/更新集合，
//! 并在单个事务中原子提交：
//!
//! - **行规范化** (`import::normalize`): 列校验、类型转换、时段解析
//! - **层级解析** (`import::resolve`): 按名称/ID 匹配现有实体，分配占位 ID
//! - **排序分配** (`import::sequence`): 同级稠密排序
//! - **冲突检测** (`import::conflict`): 重名、默认规格、重复修改
//! - **事务写入** (`import::writer`): 批量更新/插入，占位 ID 重映射
//! - **下游通知** (`import::notify`): 提交后通知搜索索引
//!
//! # 模块结构
//!
//! ```text
//! catalog-import/src/
//! ├── core/          # 配置
//! ├── import/        # 导入流水线
//! ├── db/            # 存储接口 (内存 / PostgreSQL)
//! ├── services/      # 文件存储、搜索索引
//! ├── export.rs      # 导出
//! └── utils/         # 错误、日志、校验
//! ```

pub mod core;
pub mod db;
pub mod export;
pub mod import;
pub mod services;
pub mod utils;

// Re-export 公共类型
pub use core::Config;
pub use db::{CatalogStore, CatalogTx, MemoryStore, StoreError};
pub use export::ExportTable;
pub use import::{CatalogImporter, template};
pub use services::{FileStore, HttpSearchIndex, LocalFileStore, NoopSearchIndex, SearchIndex};
pub use utils::{ImportError, ImportResult};

// Re-export unified error types from shared
pub use shared::{ApiResponse, AppError, ErrorCode};

// Re-export logger functions
pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};
