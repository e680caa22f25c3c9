// crates/wf_raster/src/lib.rs

//! WetFlow Raster Layer
//!
//! 模型栅格是无文件头的小端 f32 平铺数组，逻辑布局为 `[day][cell]`。
//! 本层负责整文件解码、按单元抽取逐日序列，以及原子地回写修改后的栅格。
//!
//! # 模块概览
//!
//! - [`raster`]: `Raster` 读写、序列抽取与单元补丁

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod raster;

// 重导出
pub use raster::{
    check_block_file, patch_cells, patch_grid_cells, read_point_series, read_year_series, CellPatch, Raster,
    CLIP_THRESHOLD,
};
