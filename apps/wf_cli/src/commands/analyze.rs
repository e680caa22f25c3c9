// apps/wf_cli/src/commands/analyze.rs

//! 分析命令
//!
//! 栅格以 `/<folder>/<file>` 引用制品存储中的作业输出，
//! 每个命令在独立的临时工作区中运行。

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use serde_json::json;
use tracing::info;
use wf_analysis::BasinContext;
use wf_config::BasinConfig;
use wf_workflow::{AnalysisRequest, AnalysisSession, ArtifactRef, LocalArtifactStore};

use super::{parse_field, parse_point, print_json};

/// 分析命令
#[derive(Subcommand)]
pub enum AnalyzeCommand {
    /// 修复前后过程线
    Hydrograph {
        /// 请求参数
        #[command(flatten)]
        request: RequestArgs,
        /// 取过程线的位置
        #[arg(long, value_enum, default_value = "wetland")]
        site: Site,
    },
    /// 湿地出口、下游水库、河口三处的洪峰差值
    Deltas(RequestArgs),
    /// 周最小流量差
    Weekly(RequestArgs),
    /// 细网格逐日对比表
    Compare(RequestArgs),
    /// T 年一遇洪峰对应的年份
    Peak(PeakArgs),
}

/// 过程线位置
#[derive(Clone, Copy, ValueEnum)]
pub enum Site {
    /// 湿地所在单元
    Wetland,
    /// 下游最近水库
    Reservoir,
}

/// 分析请求参数
#[derive(Args)]
pub struct RequestArgs {
    /// 修复前栅格 `/<folder>/<file>`
    #[arg(long)]
    pub pre: String,

    /// 修复后栅格 `/<folder>/<file>`
    #[arg(long)]
    pub post: String,

    /// 分析年份
    #[arg(long)]
    pub year: String,

    /// 纬度
    #[arg(long, allow_hyphen_values = true)]
    pub lat: String,

    /// 经度
    #[arg(long, allow_hyphen_values = true)]
    pub lon: String,
}

impl RequestArgs {
    fn parse(&self) -> Result<AnalysisRequest> {
        Ok(AnalysisRequest {
            pre: self.pre.parse::<ArtifactRef>()?,
            post: self.post.parse::<ArtifactRef>()?,
            year: parse_field("year", &self.year)?,
            point: parse_point(&self.lat, &self.lon)?,
        })
    }
}

/// 洪峰年份参数
#[derive(Args)]
pub struct PeakArgs {
    /// 作业输出文件夹
    #[arg(long)]
    pub folder: String,

    /// 纬度
    #[arg(long, allow_hyphen_values = true)]
    pub lat: String,

    /// 经度
    #[arg(long, allow_hyphen_values = true)]
    pub lon: String,

    /// 重现期（10 或 100）
    #[arg(long)]
    pub period: String,
}

fn session(config: BasinConfig) -> Result<AnalysisSession<LocalArtifactStore>> {
    let root = config.resolve(&config.storage.artifacts_root);
    let artifacts = LocalArtifactStore::new(&root)
        .with_context(|| format!("打开制品存储失败: {}", root.display()))?;
    Ok(AnalysisSession::new(
        Arc::new(BasinContext::new(config)),
        Arc::new(artifacts),
    ))
}

/// 执行分析命令
pub fn execute(config: BasinConfig, cmd: AnalyzeCommand) -> Result<()> {
    let session = session(config)?;

    match cmd {
        AnalyzeCommand::Hydrograph { request, site } => {
            let request = request.parse()?;
            let hydrograph = match site {
                Site::Wetland => session.wetland_hydrograph(&request)?,
                Site::Reservoir => session.reservoir_hydrograph(&request)?,
            };
            print_json(&hydrograph)
        }
        AnalyzeCommand::Deltas(request) => {
            let deltas = session.site_deltas(&request.parse()?)?;
            print_json(&deltas)
        }
        AnalyzeCommand::Weekly(request) => {
            let delta = session.weekly_delta(&request.parse()?)?;
            print_json(&json!({ "weekly_minimum_delta": delta }))
        }
        AnalyzeCommand::Compare(request) => {
            let rows = session.compare_flow(&request.parse()?)?;
            info!("对比表 {} 行", rows.len());
            print_json(&rows)
        }
        AnalyzeCommand::Peak(args) => {
            let point = parse_point(&args.lat, &args.lon)?;
            let period: u32 = parse_field("period", &args.period)?;
            let year = session.peak_flow_year(&args.folder, point, period)?;
            print_json(&json!({
                "folder": args.folder,
                "return_period": period,
                "year": year,
            }))
        }
    }
}
