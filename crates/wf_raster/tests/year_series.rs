// crates/wf_raster/tests/year_series.rs

//! 整年栅格序列抽取测试

use std::collections::HashMap;

use wf_foundation::WfError;
use wf_grid::{CellId, CELL_COUNT};
use wf_raster::{patch_grid_cells, read_year_series, Raster};

/// 第 `day` 天偏移 `i` 的值编码为 `day * 10000 + i`
fn year_raster(days: usize) -> Raster {
    let mut values = Vec::with_capacity(CELL_COUNT * days);
    for day in 0..days {
        for i in 0..CELL_COUNT {
            values.push((day * 10_000 + i) as f32);
        }
    }
    Raster::new(values)
}

#[test]
fn test_non_leap_year_series() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("outflw1990.bin");
    year_raster(365).write(&path).unwrap();

    let cell = CellId::new(1751);
    let series = read_year_series(&path, cell, 1990, false).unwrap();
    assert_eq!(series.len(), 365);
    assert_eq!(series[0], 1751.0);
    assert_eq!(series[1], 10_000.0 + 1751.0);
}

#[test]
fn test_day_zero_is_cell_mod_count() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("outflw1990.bin");
    year_raster(365).write(&path).unwrap();

    let cell = CellId::new(CELL_COUNT as i64 + 7);
    let series = read_year_series(&path, cell, 1990, false).unwrap();
    assert_eq!(series[0], 7.0);
}

#[test]
fn test_clip_applies_to_series() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("outflw1990.bin");
    year_raster(365).write(&path).unwrap();

    // 第 10 天起所有值都超过阈值
    let series = read_year_series(&path, CellId::new(1), 1990, true).unwrap();
    assert_eq!(series[9], 90_001.0);
    assert_eq!(series[10], 0.0);
    assert!(series[10..].iter().all(|&v| v == 0.0));
}

#[test]
fn test_leap_year_requires_366_days() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("outflw1996.bin");
    year_raster(365).write(&path).unwrap();

    assert!(matches!(
        read_year_series(&path, CellId::new(1), 1996, false),
        Err(WfError::SizeMismatch { .. })
    ));
}

#[test]
fn test_patch_grid_cells() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rivman.bin");
    Raster::filled(CELL_COUNT * 2, 0.03).write(&path).unwrap();

    let mut updates = HashMap::new();
    updates.insert(CellId::new(5), 0.2_f32);
    assert_eq!(patch_grid_cells(&path, &updates).unwrap(), 2);

    let r = Raster::read(&path).unwrap();
    assert_eq!(r.values()[5], 0.2);
    assert_eq!(r.values()[CELL_COUNT + 5], 0.2);
    assert_eq!(r.values()[4], 0.03);
}
