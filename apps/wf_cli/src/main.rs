// apps/wf_cli/src/main.rs

//! WetFlow 命令行界面
//!
//! 湿地修复情景的水文分析与模型作业管理工具。
//!
//! 所有命令的结果以 JSON 输出到标准输出，日志输出到标准错误。

mod commands;

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// WetFlow 湿地修复水文分析工具
#[derive(Parser)]
#[command(name = "wf_cli")]
#[command(author = "WetFlow Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Wetland restoration hydrology analysis and model job control", long_about = None)]
struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// 流域配置文件路径（缺省时使用当前目录下的默认布局）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 网格与查表工具
    #[command(subcommand)]
    Grid(commands::grid::GridCommand),
    /// 修复前后输出分析
    #[command(subcommand)]
    Analyze(commands::analyze::AnalyzeCommand),
    /// 情景输入修改
    #[command(subcommand)]
    Scenario(commands::scenario::ScenarioCommand),
    /// 模型作业管理
    #[command(subcommand)]
    Job(commands::job::JobCommand),
    /// 验证配置
    Validate(commands::validate::ValidateArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = commands::load_config(cli.config.as_deref())?;

    // 执行命令
    match cli.command {
        Commands::Grid(cmd) => commands::grid::execute(cmd),
        Commands::Analyze(cmd) => commands::analyze::execute(config, cmd),
        Commands::Scenario(cmd) => commands::scenario::execute(config, cmd),
        Commands::Job(cmd) => commands::job::execute(config, cmd),
        Commands::Validate(args) => commands::validate::execute(config, args),
    }
}
