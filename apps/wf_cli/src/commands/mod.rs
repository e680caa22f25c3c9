// apps/wf_cli/src/commands/mod.rs

//! 子命令与共享的参数解析

pub mod analyze;
pub mod grid;
pub mod job;
pub mod scenario;
pub mod validate;

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::Serialize;
use wf_config::BasinConfig;
use wf_foundation::{WfError, WfResult};
use wf_grid::GeoPoint;

/// 加载流域配置；未指定文件时以当前目录为根使用默认布局
pub fn load_config(path: Option<&Path>) -> Result<BasinConfig> {
    match path {
        Some(path) => BasinConfig::from_file(path)
            .with_context(|| format!("加载配置文件失败: {}", path.display())),
        None => Ok(BasinConfig::with_base_path(".")),
    }
}

/// 解析数值字段，失败时的错误包含字段名
pub fn parse_field<T: FromStr>(field: &str, raw: &str) -> WfResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| WfError::validation(format!("字段 '{field}' 不是有效数值: '{raw}'")))
}

/// 解析 `lat`/`lon` 两个字段为地理坐标
pub fn parse_point(lat: &str, lon: &str) -> WfResult<GeoPoint> {
    GeoPoint::new(parse_field("lat", lat)?, parse_field("lon", lon)?)
}

/// 以 JSON 打印结果
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("序列化输出失败")?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field_names_field() {
        assert_eq!(parse_field::<i32>("year", " 2001 ").unwrap(), 2001);

        let err = parse_field::<i32>("year", "20x1").unwrap_err();
        assert!(matches!(err, WfError::Validation { .. }));
        assert!(err.to_string().contains("year"));
    }

    #[test]
    fn test_parse_point() {
        let p = parse_point("34.95", "-104.05").unwrap();
        assert_eq!(p.cell().get(), 1);
        assert!(parse_point("north", "-104.05")
            .unwrap_err()
            .to_string()
            .contains("lat"));
        assert!(parse_point("95", "0").is_err());
    }
}
