// crates/wf_config/src/error.rs

//! 配置层错误类型

use std::path::PathBuf;

/// 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 读写配置文件失败
    #[error("配置文件 {path} 读写失败: {source}")]
    Io {
        /// 配置文件路径
        path: PathBuf,
        /// 底层IO错误
        #[source]
        source: std::io::Error,
    },

    /// JSON 解析错误
    #[error("配置文件 {path} 解析失败: {message}")]
    Parse {
        /// 配置文件路径
        path: PathBuf,
        /// 解析器消息
        message: String,
    },

    /// 序列化失败
    #[error("配置序列化失败: {0}")]
    Serialize(String),

    /// 模型年份范围为空
    #[error("模型年份范围无效: {first}-{last}")]
    YearRange {
        /// 起始年份
        first: i32,
        /// 结束年份
        last: i32,
    },

    /// 路径模板缺少占位符
    #[error("'{key}' 模板 '{template}' 缺少 {placeholder} 占位符")]
    MissingPlaceholder {
        /// 配置键
        key: String,
        /// 模板内容
        template: String,
        /// 所需占位符
        placeholder: &'static str,
    },

    /// 无效值
    #[error("无效值 '{key}': {value} - {reason}")]
    InvalidValue {
        /// 配置键
        key: String,
        /// 配置值
        value: String,
        /// 原因
        reason: String,
    },
}

impl ConfigError {
    /// 带路径的IO错误
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_placeholder_names_template() {
        let err = ConfigError::MissingPlaceholder {
            key: "layout.runoff_template".to_string(),
            template: "inp/runoff.bin".to_string(),
            placeholder: "{date}",
        };
        let text = err.to_string();
        assert!(text.contains("layout.runoff_template"));
        assert!(text.contains("{date}"));
    }

    #[test]
    fn test_io_error_names_path() {
        let err = ConfigError::io(
            "basin.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.to_string().contains("basin.json"));
    }
}
