// crates/wf_config/src/lib.rs

//! WetFlow Config Layer
//!
//! 配置层，描述一个流域部署：辅助数据文件布局、模型作业参数与本地存储位置。
//!
//! # 模块概览
//!
//! - [`basin`]: BasinConfig 流域配置（JSON 文件）
//! - [`error`]: 配置错误类型

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod basin;
pub mod error;

// 重导出核心类型
pub use basin::{
    BasinConfig, JobConfig, LayoutConfig, StorageConfig, MODEL_FIRST_YEAR, MODEL_LAST_YEAR,
};
pub use error::ConfigError;
