// crates/wf_grid/src/tables.rs

//! 辅助文本表读取
//!
//! 所有辅助表都是空白分隔的数值列，无表头。支持的表：
//!
//! - 细网格经纬度表：`(lon, lat)`，每个栅格点一行
//! - 水库坐标表：`(lon, lat)`，注意与 ISO 6709 的顺序相反
//! - 湿地位置表：`(lat, lon)`
//! - 日期表：`(year, month, day, ...)` 整数列，每个模拟日一行

use std::collections::HashSet;
use std::path::Path;

use wf_foundation::{WfError, WfResult};

use crate::geo;
use crate::grid::{cell_of, CellId, GeoPoint};

/// 读取空白分隔的数值表，每行至少 `min_columns` 列，多余列保留
pub fn read_numeric_rows(path: &Path, min_columns: usize) -> WfResult<Vec<Vec<f64>>> {
    let content = std::fs::read_to_string(path).map_err(|e| WfError::io_at(path, e))?;

    let mut rows = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let row = trimmed
            .split_whitespace()
            .map(|s| s.parse::<f64>())
            .collect::<Result<Vec<f64>, _>>()
            .map_err(|e| WfError::parse(path, line_num + 1, format!("非数值列: {e}")))?;

        if row.len() < min_columns {
            return Err(WfError::parse(
                path,
                line_num + 1,
                format!("列数不足: 期望至少 {}, 实际 {}", min_columns, row.len()),
            ));
        }
        rows.push(row);
    }

    Ok(rows)
}

/// 细网格经纬度表
#[derive(Debug, Clone, Default)]
pub struct LonLatTable {
    points: Vec<(f64, f64)>,
}

impl LonLatTable {
    /// 从 (lon, lat) 点集创建
    pub fn from_points(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    /// 从文件加载
    pub fn load(path: &Path) -> WfResult<Self> {
        let rows = read_numeric_rows(path, 2)?;
        if rows.is_empty() {
            return Err(WfError::data(format!("经纬度表为空: {}", path.display())));
        }
        Ok(Self {
            points: rows.into_iter().map(|r| (r[0], r[1])).collect(),
        })
    }

    /// 点数（同时是按日栅格的块大小）
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 全部 (lon, lat) 点
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// 最近的栅格点下标
    pub fn nearest(&self, target: GeoPoint) -> WfResult<usize> {
        geo::nearest_index(&self.points, target)
    }

    /// 最近的 `k` 个栅格点下标
    pub fn nearest_k(&self, target: GeoPoint, k: usize) -> WfResult<Vec<usize>> {
        geo::nearest_indices(&self.points, target, k)
    }
}

/// 水库所在网格单元集合
#[derive(Debug, Clone, Default)]
pub struct ReservoirSet {
    cells: HashSet<CellId>,
}

impl ReservoirSet {
    /// 从单元集合创建
    pub fn from_cells(cells: impl IntoIterator<Item = CellId>) -> Self {
        Self {
            cells: cells.into_iter().collect(),
        }
    }

    /// 从水库坐标表加载；文件列顺序为 (lon, lat)
    pub fn load(path: &Path) -> WfResult<Self> {
        let rows = read_numeric_rows(path, 2)?;
        Ok(Self::from_cells(rows.iter().map(|r| cell_of(r[1], r[0]))))
    }

    /// 是否为水库单元
    pub fn contains(&self, cell: CellId) -> bool {
        self.cells.contains(&cell)
    }

    /// 水库单元数
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// 加载湿地位置表；文件列顺序为 (lat, lon)
pub fn load_wetland_locations(path: &Path) -> WfResult<Vec<GeoPoint>> {
    read_numeric_rows(path, 2)?
        .into_iter()
        .map(|r| GeoPoint::new(r[0], r[1]))
        .collect()
}

/// 日期表
#[derive(Debug, Clone, Default)]
pub struct DateTable {
    rows: Vec<Vec<i32>>,
}

impl DateTable {
    /// 从整数行创建
    pub fn from_rows(rows: Vec<Vec<i32>>) -> Self {
        Self { rows }
    }

    /// 从文件加载；每行至少 (year, month, day)
    pub fn load(path: &Path) -> WfResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| WfError::io_at(path, e))?;

        let mut rows = Vec::new();
        for (line_num, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let row = trimmed
                .split_whitespace()
                .map(|s| s.parse::<i32>())
                .collect::<Result<Vec<i32>, _>>()
                .map_err(|e| WfError::parse(path, line_num + 1, format!("非整数列: {e}")))?;
            if row.len() < 3 {
                return Err(WfError::parse(path, line_num + 1, "日期行至少需要 year month day"));
            }
            rows.push(row);
        }

        Ok(Self { rows })
    }

    /// 某一年的全部日期行，保持文件顺序
    pub fn rows_for_year(&self, year: i32) -> Vec<&[i32]> {
        self.rows
            .iter()
            .filter(|r| r[0] == year)
            .map(|r| r.as_slice())
            .collect()
    }

    /// 总行数
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
