// crates/wf_analysis/src/hydrograph.rs

//! 过程线与流量差值
//!
//! - 洪峰附近差值：以修复后序列最大值所在日为中心，向两侧逐日扩展（最多 ±5 天），
//!   只要两侧边界中至少一侧仍有 `pre > post` 就继续，累加 `max(pre − post, 0)`。
//! - 周最小流量差：对每条序列独立找出 6 日滑动和最小的窗口，取窗口日均值之差。
//! - 三处差值：湿地出口、下游水库、河口，使用未截断序列并换算为日体积。

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;
use wf_foundation::{WfError, WfResult};
use wf_grid::{CellId, FlowNetwork};
use wf_raster::read_year_series;

use crate::context::BasinContext;
use crate::scenario::ScenarioConfig;

/// 每日秒数，流量差换算为体积差
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// 洪峰窗口最大半宽（天）
pub const PEAK_HALF_WINDOW: usize = 5;

/// 周窗口跨度（天）
pub const WEEK_SPAN: usize = 6;

/// 一个单元的修复前后过程线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hydrograph {
    /// 单元编号
    pub cell: CellId,
    /// 修复前逐日流量
    pub pre: Vec<f32>,
    /// 修复后逐日流量
    pub post: Vec<f32>,
}

/// 三处洪峰差值（体积）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteDeltas {
    /// 湿地出口
    pub wetland: f64,
    /// 下游水库
    pub reservoir: f64,
    /// 河口
    pub river_mouth: f64,
}

/// 读取某单元修复前后的截断过程线
pub fn hydrograph_pair(scenario: &ScenarioConfig, cell: CellId) -> WfResult<Hydrograph> {
    let pre = read_year_series(&scenario.pre_raster, cell, scenario.year, true)?;
    let post = read_year_series(&scenario.post_raster, cell, scenario.year, true)?;
    Ok(Hydrograph { cell, pre, post })
}

/// 湿地所在单元的过程线
pub fn wetland_hydrograph(scenario: &ScenarioConfig) -> WfResult<Hydrograph> {
    hydrograph_pair(scenario, scenario.point.cell())
}

/// 下游最近水库单元的过程线
pub fn reservoir_hydrograph(
    context: &BasinContext,
    scenario: &ScenarioConfig,
) -> WfResult<Hydrograph> {
    let network = context.flow_network()?;
    let reservoirs = context.reservoirs()?;
    let cell = network.downstream_cell_to_reservoir(scenario.point, &reservoirs)?;
    hydrograph_pair(scenario, cell)
}

fn check_pair(pre: &[f32], post: &[f32]) -> WfResult<()> {
    WfError::check_size("修复后序列", pre.len(), post.len())?;
    if pre.is_empty() {
        return Err(WfError::validation("流量序列为空"));
    }
    Ok(())
}

/// 洪峰附近的流量减少量
///
/// 洪峰日取修复后序列第一个最大值所在日。
pub fn delta_around_peak(pre: &[f32], post: &[f32]) -> WfResult<f64> {
    check_pair(pre, post)?;

    let mut peak = 0;
    for (i, &v) in post.iter().enumerate() {
        if v > post[peak] {
            peak = i;
        }
    }

    let excess = |d: usize| (pre[d] as f64 - post[d] as f64).max(0.0);
    let n = pre.len();

    let mut delta = excess(peak);
    let mut r = 1;
    while r <= PEAK_HALF_WINDOW
        && r <= peak
        && peak + r < n
        && (pre[peak - r] > post[peak - r] || pre[peak + r] > post[peak + r])
    {
        delta += excess(peak - r) + excess(peak + r);
        r += 1;
    }

    Ok(delta)
}

/// 最小滑动和窗口的起点（取第一个最小值）
fn min_week_start(series: &[f32]) -> usize {
    let sums: Vec<f64> = series
        .windows(WEEK_SPAN)
        .take(series.len() - WEEK_SPAN)
        .map(|w| w.iter().map(|&v| v as f64).sum())
        .collect();

    let mut best = 0;
    for (i, &s) in sums.iter().enumerate() {
        if s < sums[best] {
            best = i;
        }
    }
    best
}

/// 周最小流量差：`post_week_avg − pre_week_avg`
///
/// 窗口为 `[i, i + 6)`，共 `len − 6` 个；序列至少 7 天。
pub fn weekly_minimum_delta(pre: &[f32], post: &[f32]) -> WfResult<f64> {
    check_pair(pre, post)?;
    if pre.len() <= WEEK_SPAN {
        return Err(WfError::validation(format!(
            "序列长度 {} 不足 {} 天",
            pre.len(),
            WEEK_SPAN + 1
        )));
    }

    let week_avg = |series: &[f32]| {
        let start = min_week_start(series);
        series[start..start + WEEK_SPAN]
            .iter()
            .map(|&v| v as f64)
            .sum::<f64>()
            / WEEK_SPAN as f64
    };

    Ok(week_avg(post) - week_avg(pre))
}

/// 单元的洪峰差值（未截断序列，体积）
fn peak_delta_at(scenario: &ScenarioConfig, cell: CellId) -> WfResult<f64> {
    let pre = read_year_series(&scenario.pre_raster, cell, scenario.year, false)?;
    let post = read_year_series(&scenario.post_raster, cell, scenario.year, false)?;
    Ok(delta_around_peak(&pre, &post)? * SECONDS_PER_DAY)
}

/// 湿地出口、下游水库、河口三处的洪峰差值
pub fn delta_at_three_sites(
    context: &BasinContext,
    scenario: &ScenarioConfig,
) -> WfResult<SiteDeltas> {
    let network = context.flow_network()?;
    let reservoirs = context.reservoirs()?;

    let wetland_cell = FlowNetwork::wetlands_outlet_cell(scenario.point);
    let reservoir_cell = network.downstream_cell_to_reservoir(scenario.point, &reservoirs)?;
    let mouth_cell = network.downstream_cell_to_sink(scenario.point)?;
    debug!(
        "三处单元: 湿地出口 {}, 水库 {}, 河口 {}",
        wetland_cell, reservoir_cell, mouth_cell
    );

    Ok(SiteDeltas {
        wetland: peak_delta_at(scenario, wetland_cell)?,
        reservoir: peak_delta_at(scenario, reservoir_cell)?,
        river_mouth: peak_delta_at(scenario, mouth_cell)?,
    })
}

/// 单元的周最小流量差（未截断序列）
pub fn weekly_minimum_delta_at(scenario: &ScenarioConfig, cell: CellId) -> WfResult<f64> {
    let pre = read_year_series(&scenario.pre_raster, cell, scenario.year, false)?;
    let post = read_year_series(&scenario.post_raster, cell, scenario.year, false)?;
    weekly_minimum_delta(&pre, &post)
}

/// 某单元的年最大流量（未截断）
pub fn annual_peak_at(path: &Path, cell: CellId, year: i32) -> WfResult<Option<f64>> {
    let series = read_year_series(path, cell, year, false)?;
    Ok(crate::statistics::annual_peak(&series))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_above_pre_is_zero() {
        let pre = [1.0, 2.0, 3.0, 2.0, 1.0];
        let post = [2.0, 3.0, 4.0, 3.0, 2.0];
        assert_eq!(delta_around_peak(&pre, &post).unwrap(), 0.0);
    }

    #[test]
    fn test_only_peak_day_exceeds() {
        let pre = [1.0, 1.0, 9.0, 1.0, 1.0, 1.0];
        let post = [2.0, 2.0, 5.0, 2.0, 2.0, 2.0];
        // 边界 ±1 都没有 pre > post，不扩展
        assert_eq!(delta_around_peak(&pre, &post).unwrap(), 4.0);
    }

    #[test]
    fn test_expands_while_one_side_exceeds() {
        // peak = 3
        let pre = [0.0, 0.0, 5.0, 10.0, 1.0, 0.0, 0.0];
        let post = [1.0, 1.0, 2.0, 8.0, 3.0, 1.0, 1.0];
        // 2 + (3 + 0) ，r = 2 时两侧都不满足
        assert_eq!(delta_around_peak(&pre, &post).unwrap(), 5.0);
    }

    #[test]
    fn test_window_stops_at_series_edge() {
        let pre = [9.0, 9.0, 9.0];
        let post = [1.0, 5.0, 1.0];
        // r = 1 扩展一次，r = 2 越界
        assert_eq!(delta_around_peak(&pre, &post).unwrap(), 4.0 + 8.0 + 8.0);
    }

    #[test]
    fn test_window_capped_at_five_days() {
        let mut pre = vec![10.0; 21];
        let mut post = vec![1.0; 21];
        post[10] = 5.0;
        pre[10] = 5.0;
        // 只计 ±1..=±5
        assert_eq!(delta_around_peak(&pre, &post).unwrap(), 10.0 * 9.0);
    }

    #[test]
    fn test_weekly_identical_is_zero() {
        let series: Vec<f32> = (0..365).map(|d| ((d * 37) % 11) as f32 + 0.5).collect();
        assert_eq!(weekly_minimum_delta(&series, &series).unwrap(), 0.0);
    }

    #[test]
    fn test_weekly_independent_windows() {
        let pre = [5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 1.0, 1.0];
        let post = [2.0, 2.0, 2.0, 2.0, 2.0, 2.0, 9.0, 9.0];
        // pre: 窗口 [0,6) 与 [1,7)，后者和更小 → 均值 (25 + 1) / 6
        // post: 窗口 [0,6) 更小 → 均值 2
        let expected = 2.0 - 26.0 / 6.0;
        assert!((weekly_minimum_delta(&pre, &post).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_weekly_too_short() {
        let s = [1.0; 6];
        assert!(matches!(
            weekly_minimum_delta(&s, &s),
            Err(WfError::Validation { .. })
        ));
    }

    #[test]
    fn test_length_mismatch() {
        assert!(delta_around_peak(&[1.0, 2.0], &[1.0]).is_err());
        assert!(delta_around_peak(&[], &[]).is_err());
    }
}
