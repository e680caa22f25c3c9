// apps/wf_cli/src/commands/validate.rs

//! 配置验证命令
//!
//! 检查配置取值，并确认布局中的辅助文件与脚本模板存在。

use anyhow::{bail, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::{error, info, warn};
use wf_config::BasinConfig;

/// 验证参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 严格模式（缺少文件也视为错误）
    #[arg(long)]
    pub strict: bool,
}

/// 验证结果
#[derive(Default)]
struct ValidationResult {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn is_ok(&self, strict: bool) -> bool {
        self.errors.is_empty() && (!strict || self.warnings.is_empty())
    }
}

/// 布局中需要预先存在的文件
fn required_files(config: &BasinConfig) -> Vec<(&'static str, PathBuf)> {
    let layout = &config.layout;
    vec![
        ("layout.flow_direction", config.resolve(&layout.flow_direction)),
        ("layout.reservoirs", config.resolve(&layout.reservoirs)),
        ("layout.lonlat", config.resolve(&layout.lonlat)),
        ("layout.dates", config.resolve(&layout.dates)),
        ("layout.wetland_locations", config.resolve(&layout.wetland_locations)),
        ("layout.river_height", config.resolve(&layout.river_height)),
        ("layout.flood_height_original", config.resolve(&layout.flood_height_original)),
        ("job.template (pre)", config.template_path("pre")),
        ("job.template (post)", config.template_path("post")),
    ]
}

/// 执行验证命令
pub fn execute(config: BasinConfig, args: ValidateArgs) -> Result<()> {
    info!("=== WetFlow 配置验证 ===");

    let mut result = ValidationResult::default();

    if let Err(e) = config.validate() {
        result.add_error(e.to_string());
    }

    for (key, path) in required_files(&config) {
        if !path.is_file() {
            result.add_warning(format!("{key}: 文件不存在 {}", path.display()));
        }
    }

    for w in &result.warnings {
        warn!("{}", w);
    }
    for e in &result.errors {
        error!("{}", e);
    }

    if !result.is_ok(args.strict) {
        bail!(
            "验证失败: {} 个错误, {} 个警告",
            result.errors.len(),
            result.warnings.len()
        );
    }

    info!("验证通过 ({} 个警告)", result.warnings.len());
    Ok(())
}
