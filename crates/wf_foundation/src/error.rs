// crates/wf_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `WfError` 枚举和 `WfResult` 类型别名，用于分析路径（网格、流向网络、
//! 栅格、水文统计）的错误传递。作业编排层的冲突/未找到错误在 `wf_workflow` 中扩展。
//!
//! # 错误分类
//!
//! - **Validation**: 地理坐标越界、必需字段非数值等输入问题
//! - **Data**: 辅助文件或栅格缺失、截断、结构不一致，或流向遍历超出步数上限
//! - **Io**: 其余底层 IO 失败
//!
//! # 示例
//!
//! ```
//! use wf_foundation::error::{WfError, WfResult, ErrorKind};
//!
//! fn check_lat(lat: f64) -> WfResult<()> {
//!     if lat.abs() > 90.0 {
//!         return Err(WfError::validation(format!("纬度越界: {lat}")));
//!     }
//!     Ok(())
//! }
//!
//! assert_eq!(check_lat(91.0).unwrap_err().kind(), ErrorKind::Validation);
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// 统一结果类型
pub type WfResult<T> = Result<T, WfError>;

/// 错误大类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 输入校验失败
    Validation,
    /// 数据文件缺失或不一致
    Data,
    /// 底层 IO 错误
    Io,
}

/// WetFlow 错误类型
#[derive(Error, Debug)]
pub enum WfError {
    // ========================================================================
    // 输入校验
    // ========================================================================

    /// 无效输入
    #[error("无效的输入数据: {message}")]
    Validation {
        /// 说明无效原因
        message: String,
    },

    // ========================================================================
    // 数据错误
    // ========================================================================

    /// 文件不存在
    #[error("文件不存在: {path}")]
    FileNotFound {
        /// 未找到的路径
        path: PathBuf,
    },

    /// 文件解析错误
    #[error("文件解析错误: {file} 第{line}行: {message}")]
    ParseError {
        /// 文件路径
        file: PathBuf,
        /// 行号
        line: usize,
        /// 错误信息
        message: String,
    },

    /// 记录数不匹配
    #[error("记录数不匹配: {name} 期望{expected}, 实际{actual}")]
    SizeMismatch {
        /// 数据名称
        name: String,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    /// 索引越界
    #[error("索引越界: {index_type} 索引 {index} 超出范围 0..{len}")]
    IndexOutOfRange {
        /// 索引类别描述
        index_type: &'static str,
        /// 访问的索引
        index: i64,
        /// 上界（长度）
        len: usize,
    },

    /// 流向网络遍历未在上限内终止
    #[error("流向网络遍历超过 {limit} 步未终止 (起始单元 {start})")]
    TraversalLimit {
        /// 起始单元
        start: i64,
        /// 步数上限
        limit: usize,
    },

    /// 其他结构性数据错误
    #[error("数据错误: {message}")]
    Data {
        /// 具体错误信息
        message: String,
    },

    // ========================================================================
    // IO
    // ========================================================================

    /// IO 错误
    #[error("IO错误: {message}")]
    Io {
        /// 描述性错误信息
        message: String,
        #[source]
        /// 可选的底层 IO 错误
        source: Option<std::io::Error>,
    },
}

// ========================================================================
// 便捷构造方法
// ========================================================================

impl WfError {
    /// 无效输入
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// 文件不存在
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// 解析错误
    pub fn parse(file: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    /// 记录数不匹配
    pub fn size_mismatch(name: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name: name.into(),
            expected,
            actual,
        }
    }

    /// 索引越界
    pub fn index_out_of_range(index_type: &'static str, index: i64, len: usize) -> Self {
        Self::IndexOutOfRange {
            index_type,
            index,
            len,
        }
    }

    /// 数据错误
    pub fn data(message: impl Into<String>) -> Self {
        Self::Data {
            message: message.into(),
        }
    }

    /// IO 错误（带源），附带路径上下文
    pub fn io_at(path: &std::path::Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::file_not_found(path);
        }
        Self::Io {
            message: format!("{}: {}", path.display(), source),
            source: Some(source),
        }
    }

    /// 错误大类
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::FileNotFound { .. }
            | Self::ParseError { .. }
            | Self::SizeMismatch { .. }
            | Self::IndexOutOfRange { .. }
            | Self::TraversalLimit { .. }
            | Self::Data { .. } => ErrorKind::Data,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// 检查记录数是否匹配
    #[inline]
    pub fn check_size(name: &str, expected: usize, actual: usize) -> WfResult<()> {
        if expected != actual {
            Err(Self::size_mismatch(name, expected, actual))
        } else {
            Ok(())
        }
    }
}

impl From<std::io::Error> for WfError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_display() {
        let err = WfError::size_mismatch("outflw1990.bin", 2003850, 10);
        let msg = err.to_string();
        assert!(msg.contains("outflw1990.bin"));
        assert!(msg.contains("2003850"));
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(WfError::validation("lat").kind(), ErrorKind::Validation);
        assert_eq!(WfError::data("bad").kind(), ErrorKind::Data);
        assert_eq!(
            WfError::TraversalLimit { start: 12, limit: 5491 }.kind(),
            ErrorKind::Data
        );
        assert_eq!(WfError::from(std::io::Error::other("x")).kind(), ErrorKind::Io);
    }

    #[test]
    fn test_io_at_maps_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = WfError::io_at(Path::new("/no/such/nextxy.txt"), io_err);
        assert!(matches!(err, WfError::FileNotFound { .. }));
        assert_eq!(err.kind(), ErrorKind::Data);
    }

    #[test]
    fn test_check_size() {
        assert!(WfError::check_size("raster", 10, 10).is_ok());
        assert!(WfError::check_size("raster", 10, 5).is_err());
    }
}
