// apps/wf_cli/src/commands/job.rs

//! 模型作业命令
//!
//! 作业记录保存在 `storage.jobs_dir`，每条记录一个 JSON 文件；
//! 运行槽与文件夹名约束通过独占创建的键文件实现，多个命令进程之间同样有效。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use serde_json::json;
use tracing::info;
use wf_analysis::RoughnessUpdate;
use wf_config::BasinConfig;
use wf_workflow::{
    FileJobStore, JobOrchestrator, LaunchOutcome, LaunchParams, LocalArtifactStore,
    LoggingListener, ModelKind, ShellLauncher,
};

use super::{parse_field, parse_point, print_json};

type Orchestrator = JobOrchestrator<FileJobStore, LocalArtifactStore, ShellLauncher>;

/// 作业命令
#[derive(Subcommand)]
pub enum JobCommand {
    /// 启动修复前模型运行
    RunPre(RunArgs),
    /// 启动修复后模型运行（先写入糙率情景）
    RunPost(RunPostArgs),
    /// 查询作业状态
    Status(FolderArgs),
    /// 删除作业记录与输出文件夹
    Remove(FolderArgs),
    /// 列出全部作业
    List,
    /// 完成钩子：上传运行中作业的输出
    Complete(CompleteArgs),
    /// 恢复钩子：运行中的作业标记为错误
    Recover,
}

/// 启动参数
#[derive(Args)]
pub struct RunArgs {
    /// 输出文件夹名
    #[arg(long)]
    pub folder: String,

    /// 起始年份
    #[arg(long)]
    pub start_year: String,

    /// 结束年份
    #[arg(long)]
    pub end_year: String,
}

/// 修复后运行参数
#[derive(Args)]
pub struct RunPostArgs {
    /// 年份与文件夹
    #[command(flatten)]
    pub run: RunArgs,

    /// 目标纬度
    #[arg(long, allow_hyphen_values = true)]
    pub lat: String,

    /// 目标经度
    #[arg(long, allow_hyphen_values = true)]
    pub lon: String,

    /// 河道糙率基准值
    #[arg(long)]
    pub river_base: String,

    /// 目标单元河道糙率
    #[arg(long)]
    pub river_new: String,

    /// 洪泛区糙率基准值
    #[arg(long)]
    pub flood_base: String,

    /// 目标单元洪泛区糙率
    #[arg(long)]
    pub flood_new: String,

    /// 湿地规模
    #[arg(long)]
    pub wetland_size: String,
}

/// 文件夹参数
#[derive(Args)]
pub struct FolderArgs {
    /// 输出文件夹名
    #[arg(long)]
    pub folder: String,
}

/// 完成钩子参数
#[derive(Args)]
pub struct CompleteArgs {
    /// 模型输出目录（缺省为配置中的 `layout.model_output_dir`）
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

impl RunArgs {
    fn params(&self) -> Result<LaunchParams> {
        Ok(LaunchParams::years(
            parse_field("start_year", &self.start_year)?,
            parse_field("end_year", &self.end_year)?,
        ))
    }
}

impl RunPostArgs {
    fn params(&self) -> Result<LaunchParams> {
        let mut params = self.run.params()?;
        params.roughness = Some(RoughnessUpdate {
            point: parse_point(&self.lat, &self.lon)?,
            river_base: parse_field("river_base", &self.river_base)?,
            river_new: parse_field("river_new", &self.river_new)?,
            flood_base: parse_field("flood_base", &self.flood_base)?,
            flood_new: parse_field("flood_new", &self.flood_new)?,
            wetland_size: parse_field("wetland_size", &self.wetland_size)?,
        });
        Ok(params)
    }
}

fn orchestrator(config: BasinConfig) -> Result<Orchestrator> {
    let jobs_dir = config.resolve(&config.storage.jobs_dir);
    let store = FileJobStore::new(&jobs_dir)
        .with_context(|| format!("打开作业存储失败: {}", jobs_dir.display()))?;

    let artifacts_root = config.resolve(&config.storage.artifacts_root);
    let artifacts = LocalArtifactStore::new(&artifacts_root)
        .with_context(|| format!("打开制品存储失败: {}", artifacts_root.display()))?;

    let launcher = ShellLauncher::new(config.job.launcher.clone(), config.job.launcher_args.clone());

    let orchestrator =
        JobOrchestrator::new(config, Arc::new(store), Arc::new(artifacts), launcher);
    orchestrator
        .events()
        .add_listener(Arc::new(LoggingListener::new("wf_cli")));
    Ok(orchestrator)
}

fn report_launch(outcome: LaunchOutcome) -> Result<()> {
    match outcome {
        LaunchOutcome::Launched(record) => print_json(&record),
        LaunchOutcome::Busy { running } => {
            bail!("已有作业在运行: '{running}'，请等待其结束后再启动")
        }
        LaunchOutcome::AlreadyExists { folder } => {
            bail!("文件夹 '{folder}' 已存在，请换一个名称或先删除")
        }
    }
}

/// 执行作业命令
pub fn execute(config: BasinConfig, cmd: JobCommand) -> Result<()> {
    let default_output = config.resolve(&config.layout.model_output_dir);
    let orchestrator = orchestrator(config)?;

    match cmd {
        JobCommand::RunPre(args) => {
            let params = args.params()?;
            report_launch(orchestrator.launch(ModelKind::PreFlow, &args.folder, &params)?)
        }
        JobCommand::RunPost(args) => {
            let params = args.params()?;
            report_launch(orchestrator.launch(ModelKind::PostFlow, &args.run.folder, &params)?)
        }
        JobCommand::Status(args) => {
            let status = orchestrator.status(&args.folder)?;
            print_json(&json!({ "folder": args.folder, "status": status }))
        }
        JobCommand::Remove(args) => {
            orchestrator.remove(&args.folder)?;
            info!("已删除 '{}'", args.folder);
            print_json(&json!({ "folder": args.folder, "removed": true }))
        }
        JobCommand::List => print_json(&orchestrator.list()?),
        JobCommand::Complete(args) => {
            let output_dir = args.output_dir.unwrap_or(default_output);
            let record = orchestrator.complete_running(&output_dir)?;
            print_json(&record)
        }
        JobCommand::Recover => {
            let record = orchestrator.recover()?;
            print_json(&record)
        }
    }
}
