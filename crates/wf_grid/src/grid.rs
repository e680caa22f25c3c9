// crates/wf_grid/src/grid.rs

//! 流域离散网格
//!
//! 固定 90 列 × 61 行 = 5490 个单元，使用从 1 开始的线性单元编号。
//! 经纬度到单元编号的映射以 (34.95°, 104.05°) 为基准点，步长 0.1°。
//!
//! 单元编号只对流域内的坐标有意义；除算术本身外不做越界校验，
//! 因此 [`CellId`] 可能为非正数或超过 [`CELL_COUNT`]。

use serde::{Deserialize, Serialize};
use wf_foundation::{WfError, WfResult};

/// 网格列数
pub const GRID_COLS: usize = 90;
/// 网格行数
pub const GRID_ROWS: usize = 61;
/// 单元总数
pub const CELL_COUNT: usize = GRID_COLS * GRID_ROWS;

/// 基准纬度
pub const LAT_BASELINE: f64 = 34.95;
/// 基准经度（取反后的西经）
pub const LON_BASELINE: f64 = 104.05;

/// 网格单元编号（从 1 开始）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(i64);

impl CellId {
    /// 从原始编号创建
    #[inline]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// 原始编号
    #[inline]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// 从流向表坐标创建：`x + (y - 1) * 90`
    #[inline]
    pub const fn from_xy(x: i64, y: i64) -> Self {
        Self(x + (y - 1) * GRID_COLS as i64)
    }

    /// 流向遍历的起始坐标：`(id mod 90 + 1, floor(id / 90) + 1)`
    ///
    /// 这与 [`CellId::from_xy`] 并非互逆，遍历的起点语义依赖该偏移。
    #[inline]
    pub fn grid_xy(self) -> (i64, i64) {
        let cols = GRID_COLS as i64;
        (self.0.rem_euclid(cols) + 1, self.0.div_euclid(cols) + 1)
    }

    /// 在按日分块栅格中的块内偏移：`id mod 5490`（非负）
    #[inline]
    pub fn raster_offset(self) -> usize {
        self.0.rem_euclid(CELL_COUNT as i64) as usize
    }
}

impl std::fmt::Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 经纬度到单元编号
///
/// `cell = floor((34.95 − lat) * 10) * 90 + floor((104.05 + lon) * 10 + 1)`
#[inline]
pub fn cell_of(lat: f64, lon: f64) -> CellId {
    let row = ((LAT_BASELINE - lat) * 10.0).floor() as i64;
    let col = ((LON_BASELINE + lon) * 10.0 + 1.0).floor() as i64;
    CellId(row * GRID_COLS as i64 + col)
}

/// 是否为闰年（公历）
#[inline]
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// 一年的天数
#[inline]
pub fn days_in_year(year: i32) -> usize {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

/// 经过校验的地理坐标（度）
///
/// 取代"0 表示沿用上次坐标"的约定：调用方必须显式给出坐标，
/// 赤道与本初子午线上的 0 值不再有歧义。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// 纬度
    pub lat: f64,
    /// 经度
    pub lon: f64,
}

impl GeoPoint {
    /// 创建并校验坐标：`|lat| <= 90`，`|lon| <= 360`
    pub fn new(lat: f64, lon: f64) -> WfResult<Self> {
        if !lat.is_finite() || lat.abs() > 90.0 {
            return Err(WfError::validation(format!("纬度越界: {lat}")));
        }
        if !lon.is_finite() || lon.abs() > 360.0 {
            return Err(WfError::validation(format!("经度越界: {lon}")));
        }
        Ok(Self { lat, lon })
    }

    /// 所在网格单元
    #[inline]
    pub fn cell(&self) -> CellId {
        cell_of(self.lat, self.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_cell() {
        assert_eq!(cell_of(34.95, -104.05), CellId::new(1));
    }

    #[test]
    fn test_cell_of_deterministic() {
        let a = cell_of(33.0, -100.0);
        for _ in 0..10 {
            assert_eq!(cell_of(33.0, -100.0), a);
        }
        // floor(19.5) * 90 + floor(41.49..)
        assert_eq!(a, CellId::new(19 * 90 + 41));
    }

    #[test]
    fn test_grid_xy_and_from_xy() {
        let cell = CellId::new(185);
        assert_eq!(cell.grid_xy(), (6, 3));
        assert_eq!(CellId::from_xy(6, 3), CellId::new(186));
        assert_eq!(CellId::from_xy(1, 1), CellId::new(1));
    }

    #[test]
    fn test_raster_offset_non_negative() {
        assert_eq!(CellId::new(5490).raster_offset(), 0);
        assert_eq!(CellId::new(5491).raster_offset(), 1);
        assert_eq!(CellId::new(-1).raster_offset(), 5489);
    }

    #[test]
    fn test_days_in_year() {
        assert_eq!(days_in_year(1990), 365);
        assert_eq!(days_in_year(1996), 366);
        assert_eq!(days_in_year(1900), 365);
        assert_eq!(days_in_year(2000), 366);
    }

    #[test]
    fn test_geo_point_validation() {
        assert!(GeoPoint::new(33.0, -100.0).is_ok());
        assert!(GeoPoint::new(0.0, 0.0).is_ok());
        assert!(GeoPoint::new(91.0, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -361.0).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
    }
}
