//! 工具模块 - 通用工具函数和类型
//!
//! # 内容
//!
//! - [`ImportError`] - 导入错误类型，可转换为 [`AppError`](shared::AppError)
//! - 数值/文本校验
//! - 日志

pub mod error;
pub mod logger;
pub mod validation;

pub use error::{ImportError, ImportResult};
