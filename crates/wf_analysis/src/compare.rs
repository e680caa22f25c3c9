// crates/wf_analysis/src/compare.rs

//! 修复前后流量对比表

use serde::{Deserialize, Serialize};
use tracing::debug;
use wf_foundation::{WfError, WfResult};
use wf_grid::{days_in_year, DateTable, LonLatTable};
use wf_raster::read_point_series;

use crate::scenario::ScenarioConfig;

/// m³/s 到 ft³/s
pub const CFS_PER_CMS: f64 = 35.31;

/// 对比表的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRow {
    /// 日期表中的原始列 (year, month, day, ...)
    pub date: Vec<i32>,
    /// 修复前流量 (ft³/s)
    pub preflow: f64,
    /// 修复后流量 (ft³/s)
    pub postflow: f64,
}

/// 生成指定年份的逐日对比表
///
/// 位置解析到细网格上最近的点，栅格块大小等于经纬度表长度。
/// 日期表中该年的行数必须等于该年天数。
pub fn compare_flow_table(
    scenario: &ScenarioConfig,
    lonlat: &LonLatTable,
    dates: &DateTable,
) -> WfResult<Vec<FlowRow>> {
    let index = lonlat.nearest(scenario.point)?;
    let days = days_in_year(scenario.year);
    debug!("对比表: 最近细网格点 {} / {}", index, lonlat.len());

    let pre = read_point_series(&scenario.pre_raster, index, lonlat.len(), days, true)?;
    let post = read_point_series(&scenario.post_raster, index, lonlat.len(), days, true)?;

    let rows = dates.rows_for_year(scenario.year);
    WfError::check_size(&format!("{} 年日期行", scenario.year), days, rows.len())?;

    Ok(rows
        .into_iter()
        .zip(pre.iter().zip(post.iter()))
        .map(|(date, (&pre, &post))| FlowRow {
            date: date.to_vec(),
            preflow: pre as f64 * CFS_PER_CMS,
            postflow: post as f64 * CFS_PER_CMS,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_grid::GeoPoint;
    use wf_raster::Raster;

    fn write_raster(path: &std::path::Path, points: usize, days: usize, f: impl Fn(usize, usize) -> f32) {
        let mut values = Vec::with_capacity(points * days);
        for day in 0..days {
            for i in 0..points {
                values.push(f(day, i));
            }
        }
        Raster::new(values).write(path).unwrap();
    }

    #[test]
    fn test_compare_flow_table() {
        let dir = tempfile::tempdir().unwrap();
        let pre = dir.path().join("pre.bin");
        let post = dir.path().join("post.bin");
        write_raster(&pre, 2, 365, |day, i| if i == 1 { day as f32 } else { 0.0 });
        write_raster(&post, 2, 365, |day, i| {
            if i == 1 && day == 3 {
                200_000.0
            } else if i == 1 {
                1.0
            } else {
                0.0
            }
        });

        let lonlat = LonLatTable::from_points(vec![(-100.0, 30.0), (-99.0, 31.0)]);
        let mut rows = vec![vec![1989, 12, 31]];
        let start = chrono::NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
        for d in start.iter_days().take(365) {
            use chrono::Datelike;
            rows.push(vec![d.year(), d.month() as i32, d.day() as i32]);
        }
        let dates = DateTable::from_rows(rows);

        let scenario = ScenarioConfig {
            pre_raster: pre,
            post_raster: post,
            year: 1990,
            point: GeoPoint::new(31.0, -99.0).unwrap(),
        };
        let table = compare_flow_table(&scenario, &lonlat, &dates).unwrap();
        assert_eq!(table.len(), 365);
        assert_eq!(table[0].date, vec![1990, 1, 1]);
        assert!((table[2].preflow - 2.0 * CFS_PER_CMS).abs() < 1e-9);
        assert!((table[2].postflow - CFS_PER_CMS).abs() < 1e-9);
        // 超过阈值的值截断为 0
        assert_eq!(table[3].postflow, 0.0);
    }

    #[test]
    fn test_date_rows_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let pre = dir.path().join("pre.bin");
        write_raster(&pre, 1, 365, |_, _| 1.0);

        let scenario = ScenarioConfig {
            pre_raster: pre.clone(),
            post_raster: pre,
            year: 1990,
            point: GeoPoint::new(31.0, -99.0).unwrap(),
        };
        let lonlat = LonLatTable::from_points(vec![(-99.0, 31.0)]);
        let dates = DateTable::from_rows(vec![vec![1990, 1, 1]]);
        assert!(matches!(
            compare_flow_table(&scenario, &lonlat, &dates),
            Err(WfError::SizeMismatch { .. })
        ));
    }
}
