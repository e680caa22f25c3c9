// crates/wf_grid/src/lib.rs

//! WetFlow Grid Layer
//!
//! 网格层，负责把地理坐标映射到固定的流域网格，并在预计算的流向网络上
//! 定位水文意义上的关键单元（河口、下游水库、湿地出口）。
//!
//! # 模块概览
//!
//! - [`grid`]: 网格常量、`CellId`、`GeoPoint` 与坐标映射
//! - [`geo`]: 大圆距离与最近点查找
//! - [`tables`]: 辅助文本表（经纬度、水库、湿地、日期）
//! - [`flow_network`]: 流向网络加载、缓存与下游遍历
//!
//! # 示例
//!
//! ```
//! use wf_grid::{cell_of, CellId};
//!
//! assert_eq!(cell_of(34.95, -104.05), CellId::new(1));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod flow_network;
pub mod geo;
pub mod grid;
pub mod tables;

// 重导出核心类型
pub use flow_network::{FlowNetwork, FlowNetworkCache, SINK, TRAVERSAL_LIMIT};
pub use geo::{great_circle_distance, nearest_index, nearest_indices, EARTH_RADIUS_KM};
pub use grid::{
    cell_of, days_in_year, is_leap_year, CellId, GeoPoint, CELL_COUNT, GRID_COLS, GRID_ROWS,
};
pub use tables::{load_wetland_locations, DateTable, LonLatTable, ReservoirSet};
