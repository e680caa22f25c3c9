// crates/wf_foundation/src/lib.rs

//! WetFlow Foundation Layer
//!
//! 基础层，提供全项目共用的错误类型。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型 `WfError` 与错误大类 `ErrorKind`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;

// 重导出常用类型
pub use error::{ErrorKind, WfError, WfResult};
