// apps/wf_cli/src/commands/grid.rs

//! 网格与查表命令

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::json;
use wf_analysis::VegetationType;

use super::{parse_point, print_json};

/// 网格命令
#[derive(Subcommand)]
pub enum GridCommand {
    /// 坐标所在的网格单元
    Cell(CellArgs),
    /// 植被类型对应的 Manning 糙率
    Veg(VegArgs),
}

/// 坐标参数
#[derive(Args)]
pub struct CellArgs {
    /// 纬度
    #[arg(long, allow_hyphen_values = true)]
    pub lat: String,

    /// 经度
    #[arg(long, allow_hyphen_values = true)]
    pub lon: String,
}

/// 植被参数
#[derive(Args)]
pub struct VegArgs {
    /// 植被类型 (crop, pasture, bush, tree)
    pub name: String,
}

/// 执行网格命令
pub fn execute(cmd: GridCommand) -> Result<()> {
    match cmd {
        GridCommand::Cell(args) => {
            let point = parse_point(&args.lat, &args.lon)?;
            let cell = point.cell();
            let (x, y) = cell.grid_xy();
            print_json(&json!({
                "lat": point.lat,
                "lon": point.lon,
                "cell": cell.get(),
                "x": x,
                "y": y,
            }))
        }
        GridCommand::Veg(args) => {
            let veg: VegetationType = args
                .name
                .parse()
                .with_context(|| format!("未知植被类型: {}", args.name))?;
            print_json(&json!({
                "vegetation": veg.name(),
                "manning": veg.manning(),
            }))
        }
    }
}
