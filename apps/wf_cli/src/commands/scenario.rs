// apps/wf_cli/src/commands/scenario.rs

//! 情景输入命令

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde_json::json;
use wf_analysis::{update_groundwater_inflow, BasinContext, GroundwaterInflow};
use wf_config::BasinConfig;
use wf_foundation::{WfError, WfResult};
use wf_grid::GeoPoint;

use super::{parse_field, parse_point, print_json};

/// 情景命令
#[derive(Subcommand)]
pub enum ScenarioCommand {
    /// 把地下水补给叠加到日径流栅格
    Groundwater(GroundwaterArgs),
}

/// 地下水补给参数
#[derive(Args)]
pub struct GroundwaterArgs {
    /// 起始日期 YYYY-MM-DD（含）
    #[arg(long)]
    pub start: String,

    /// 结束日期 YYYY-MM-DD（含）
    #[arg(long)]
    pub end: String,

    /// 湿地位置 `lat,lon`，可重复
    #[arg(long = "wetland", required = true, allow_hyphen_values = true)]
    pub wetlands: Vec<String>,

    /// 区间总补给量
    #[arg(long)]
    pub total_flow: String,
}

fn parse_date(field: &str, raw: &str) -> WfResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| WfError::validation(format!("字段 '{field}' 不是有效日期: '{raw}'")))
}

fn parse_wetland(raw: &str) -> WfResult<GeoPoint> {
    let (lat, lon) = raw
        .split_once(',')
        .ok_or_else(|| WfError::validation(format!("字段 'wetland' 必须形如 lat,lon: '{raw}'")))?;
    parse_point(lat, lon)
}

/// 执行情景命令
pub fn execute(config: BasinConfig, cmd: ScenarioCommand) -> Result<()> {
    match cmd {
        ScenarioCommand::Groundwater(args) => {
            let inflow = GroundwaterInflow {
                start: parse_date("start", &args.start)?,
                end: parse_date("end", &args.end)?,
                wetlands: args
                    .wetlands
                    .iter()
                    .map(|w| parse_wetland(w))
                    .collect::<WfResult<_>>()?,
                total_flow: parse_field("total_flow", &args.total_flow)?,
            };

            let context = BasinContext::new(config);
            let lonlat = context.lonlat()?;
            let days = update_groundwater_inflow(context.config(), &lonlat, &inflow)?;
            print_json(&json!({
                "days": days,
                "daily_increment": inflow.daily_increment(),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wetland() {
        let p = parse_wetland("33.0,-100.0").unwrap();
        assert_eq!((p.lat, p.lon), (33.0, -100.0));
        assert!(parse_wetland("33.0").is_err());
        assert!(parse_wetland("33.0,west").unwrap_err().to_string().contains("lon"));
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("start", "2001-02-28").unwrap(),
            NaiveDate::from_ymd_opt(2001, 2, 28).unwrap()
        );
        assert!(parse_date("end", "2001-02-30").unwrap_err().to_string().contains("end"));
    }
}
