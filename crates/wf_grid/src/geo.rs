// crates/wf_grid/src/geo.rs

//! 大圆距离与最近点查找
//!
//! 距离使用球面余弦定理，地球半径取 6374 km。
//! 最近点查找面向细网格经纬度表，逐点计算距离后取最小值。

use rayon::prelude::*;
use wf_foundation::{WfError, WfResult};

use crate::grid::GeoPoint;

/// 地球平均半径 (km)
pub const EARTH_RADIUS_KM: f64 = 6374.0;

/// 球面余弦定理大圆距离 (km)
///
/// 负经度先加 360 归一化到 [0, 360)。`|lat| > 90` 或 `|lon| > 360` 视为无效输入。
pub fn great_circle_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> WfResult<f64> {
    if lat1.abs() > 90.0 || lat2.abs() > 90.0 || lon1.abs() > 360.0 || lon2.abs() > 360.0 {
        return Err(WfError::validation(format!(
            "坐标越界: ({lat1}, {lon1}) -> ({lat2}, {lon2})"
        )));
    }

    let lon1 = if lon1 < 0.0 { lon1 + 360.0 } else { lon1 };
    let lon2 = if lon2 < 0.0 { lon2 + 360.0 } else { lon2 };

    let (lat1, lon1) = (lat1.to_radians(), lon1.to_radians());
    let (lat2, lon2) = (lat2.to_radians(), lon2.to_radians());

    // 同一点时舍入误差可能让余弦略大于 1
    let cos_angle = (lat1.cos() * lat2.cos() * (lon1 - lon2).cos() + lat1.sin() * lat2.sin())
        .clamp(-1.0, 1.0);

    Ok(EARTH_RADIUS_KM * cos_angle.acos())
}

/// 计算目标点到每个 (lon, lat) 点的距离
pub fn distances_to(points: &[(f64, f64)], target: GeoPoint) -> WfResult<Vec<f64>> {
    points
        .par_iter()
        .map(|&(lon, lat)| great_circle_distance(target.lat, target.lon, lat, lon))
        .collect()
}

/// 距目标点最近的点的下标；距离相同时取靠前者
pub fn nearest_index(points: &[(f64, f64)], target: GeoPoint) -> WfResult<usize> {
    let distances = distances_to(points, target)?;

    let mut best: Option<(usize, f64)> = None;
    for (i, &d) in distances.iter().enumerate() {
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((i, d)),
        }
    }

    best.map(|(i, _)| i)
        .ok_or_else(|| WfError::data("经纬度表为空，无法查找最近点"))
}

/// 距目标点最近的 `k` 个点的下标，按距离升序
pub fn nearest_indices(points: &[(f64, f64)], target: GeoPoint, k: usize) -> WfResult<Vec<usize>> {
    let distances = distances_to(points, target)?;

    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| distances[a].total_cmp(&distances[b]));
    order.truncate(k);
    Ok(order)
}
