// crates/wf_analysis/src/scenario.rs

//! 情景构造
//!
//! [`ScenarioConfig`] 是单次分析请求的全部输入，按值传递，不持久化、不共享。
//!
//! 情景修改直接改写模型输入栅格：
//!
//! - [`update_roughness`]: 重写河道/洪泛区糙率栅格，并在参考湿地附近下挖洪泛区高程
//! - [`update_groundwater_inflow`]: 在一段日期内把地下水补给均匀叠加到逐日径流栅格
//!
//! 这些操作与同一文件的读取没有锁保护，互斥由单作业约束保证。

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use wf_config::BasinConfig;
use wf_foundation::{WfError, WfResult};
use wf_grid::{load_wetland_locations, GeoPoint, LonLatTable};
use wf_raster::{check_block_file, patch_cells, CellPatch, Raster};

/// 洪泛区高程下挖量
pub const FLOOD_HEIGHT_OFFSET: f32 = 1.5;

/// 地下水补给单位换算系数
pub const GROUNDWATER_UNIT_FACTOR: f64 = 0.0256;

/// 单次分析请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// 修复前模型输出栅格
    pub pre_raster: PathBuf,
    /// 修复后模型输出栅格
    pub post_raster: PathBuf,
    /// 分析年份
    pub year: i32,
    /// 分析位置
    pub point: GeoPoint,
}

/// 糙率情景参数
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoughnessUpdate {
    /// 目标位置
    pub point: GeoPoint,
    /// 河道糙率基准值
    pub river_base: f32,
    /// 目标单元河道糙率
    pub river_new: f32,
    /// 洪泛区糙率基准值
    pub flood_base: f32,
    /// 目标单元洪泛区糙率
    pub flood_new: f32,
    /// 湿地规模：下挖参考湿地最近的 `wetland_size + 1` 个网格点
    pub wetland_size: usize,
}

/// 重写糙率与洪泛区高程栅格
///
/// 目标下标为 `cell_of(point) − 1`；记录数取自河道高度栅格。
pub fn update_roughness(config: &BasinConfig, update: &RoughnessUpdate) -> WfResult<()> {
    let layout = &config.layout;

    let count = Raster::read(&config.resolve(&layout.river_height))?.len();
    let target = update.point.cell().get() - 1;
    if target < 0 || target as usize >= count {
        return Err(WfError::index_out_of_range("糙率栅格", target, count));
    }
    let target = target as usize;

    let mut river = Raster::filled(count, update.river_base);
    river.values_mut()[target] = update.river_new;
    river.write(&config.resolve(&layout.river_roughness))?;

    let mut flood = Raster::filled(count, update.flood_base);
    flood.values_mut()[target] = update.flood_new;
    flood.write(&config.resolve(&layout.flood_roughness))?;

    // 洪泛区高程：原始栅格按层堆叠，每层一份细网格
    let lonlat = LonLatTable::load(&config.resolve(&layout.lonlat))?;
    let wetlands = load_wetland_locations(&config.resolve(&layout.wetland_locations))?;
    let reference = wetlands.get(layout.reference_wetland_row).ok_or_else(|| {
        WfError::data(format!(
            "湿地位置表只有 {} 行，缺少参考行 {}",
            wetlands.len(),
            layout.reference_wetland_row
        ))
    })?;

    let mut height = Raster::read(&config.resolve(&layout.flood_height_original))?;
    let points = lonlat.len();
    if height.is_empty() || height.len() % points != 0 {
        return Err(WfError::data(format!(
            "洪泛区高程记录数 {} 不是经纬度点数 {} 的正整数倍",
            height.len(),
            points
        )));
    }
    let layers = height.len() / points;

    let nearest = lonlat.nearest_k(*reference, update.wetland_size + 1)?;
    for layer in height.values_mut().chunks_exact_mut(points) {
        for &i in &nearest {
            layer[i] -= FLOOD_HEIGHT_OFFSET;
        }
    }
    height.write(&config.resolve(&layout.flood_height))?;

    info!(
        "糙率情景已写入: 单元 {} (下标 {}), 下挖 {} 个网格点 × {} 层",
        update.point.cell(),
        target,
        nearest.len(),
        layers
    );
    Ok(())
}

/// 地下水补给情景参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundwaterInflow {
    /// 起始日期（含）
    pub start: NaiveDate,
    /// 结束日期（含）
    pub end: NaiveDate,
    /// 湿地位置
    pub wetlands: Vec<GeoPoint>,
    /// 区间内的总补给量
    pub total_flow: f64,
}

impl GroundwaterInflow {
    /// 区间天数（含两端）
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// 每日增量（已乘单位换算系数）
    pub fn daily_increment(&self) -> f64 {
        self.total_flow / self.days() as f64 * GROUNDWATER_UNIT_FACTOR
    }
}

/// 把地下水补给叠加到区间内每天的径流栅格，返回处理的天数
///
/// 每个湿地解析到最近的细网格点，多个湿地落在同一点时只叠加一次。
pub fn update_groundwater_inflow(
    config: &BasinConfig,
    lonlat: &LonLatTable,
    inflow: &GroundwaterInflow,
) -> WfResult<usize> {
    if inflow.end < inflow.start {
        return Err(WfError::validation(format!(
            "结束日期 {} 早于起始日期 {}",
            inflow.end, inflow.start
        )));
    }
    if !inflow.total_flow.is_finite() {
        return Err(WfError::validation(format!("总补给量无效: {}", inflow.total_flow)));
    }
    if inflow.wetlands.is_empty() {
        return Err(WfError::validation("未提供湿地位置"));
    }

    let resolved: BTreeSet<usize> = inflow
        .wetlands
        .iter()
        .map(|&w| lonlat.nearest(w))
        .collect::<WfResult<_>>()?;

    let increment = inflow.daily_increment() as f32;
    let updates: BTreeMap<usize, CellPatch> = resolved
        .iter()
        .map(|&i| (i, CellPatch::Add(increment)))
        .collect();

    let paths: Vec<PathBuf> = inflow
        .start
        .iter_days()
        .take_while(|d| *d <= inflow.end)
        .map(|date| config.runoff_path(&date.format("%Y%m%d").to_string()))
        .collect();
    // 全部日文件先通过检查，再开始改写
    for path in &paths {
        check_block_file(path, lonlat.len())?;
    }
    for path in &paths {
        patch_cells(path, lonlat.len(), &updates)?;
    }
    let days = paths.len();

    info!(
        "地下水补给已叠加: {} ~ {}, {} 天, {} 个网格点, 每日增量 {}",
        inflow.start,
        inflow.end,
        days,
        resolved.len(),
        increment
    );
    Ok(days)
}
