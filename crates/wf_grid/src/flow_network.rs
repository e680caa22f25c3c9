// crates/wf_grid/src/flow_network.rs

//! 流向网络
//!
//! 流向表为每个网格单元给出下游单元坐标 `(next_x, next_y)`，`next_x == -9999`
//! 表示汇点（河口或流出流域）。文件按行优先顺序逐单元一行，共 5490 行。
//!
//! 提供两种独立的下游遍历：
//!
//! - 沿流向走到汇点，返回汇点前的最后一个单元（河口）
//! - 沿流向走到第一个水库单元
//!
//! 两者都以 `CELL_COUNT + 1` 步为上限，流向表中存在环时返回错误而不是死循环。
//! 湿地出口是单步算术偏移，与遍历无关。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};
use wf_foundation::{WfError, WfResult};

use crate::grid::{CellId, GeoPoint, CELL_COUNT, GRID_COLS, GRID_ROWS};
use crate::tables::{read_numeric_rows, ReservoirSet};

/// 汇点标记
pub const SINK: i64 = -9999;

/// 遍历步数上限
pub const TRAVERSAL_LIMIT: usize = CELL_COUNT + 1;

/// 流向网络（只读）
#[derive(Debug, Clone)]
pub struct FlowNetwork {
    /// 下游 x 坐标，行优先，长度 CELL_COUNT
    next_x: Vec<i64>,
    /// 下游 y 坐标，行优先，长度 CELL_COUNT
    next_y: Vec<i64>,
}

impl FlowNetwork {
    /// 从行优先的下游坐标数组创建
    pub fn from_vectors(next_x: Vec<i64>, next_y: Vec<i64>) -> WfResult<Self> {
        WfError::check_size("next_x", CELL_COUNT, next_x.len())?;
        WfError::check_size("next_y", CELL_COUNT, next_y.len())?;
        Ok(Self { next_x, next_y })
    }

    /// 从流向表文件加载
    pub fn load(path: &Path) -> WfResult<Self> {
        let rows = read_numeric_rows(path, 2)?;
        WfError::check_size(&path.display().to_string(), CELL_COUNT, rows.len())?;

        let mut next_x = Vec::with_capacity(CELL_COUNT);
        let mut next_y = Vec::with_capacity(CELL_COUNT);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != 2 || row.iter().any(|v| v.fract() != 0.0) {
                return Err(WfError::parse(path, i + 1, "流向表每行应为两个整数"));
            }
            next_x.push(row[0] as i64);
            next_y.push(row[1] as i64);
        }

        info!("流向网络已加载: {} ({} 个单元)", path.display(), CELL_COUNT);
        Ok(Self { next_x, next_y })
    }

    /// 流向表坐标 (x, y) 对应的单元下游坐标
    fn next_of(&self, x: i64, y: i64) -> WfResult<(i64, i64)> {
        if !(1..=GRID_COLS as i64).contains(&x) || !(1..=GRID_ROWS as i64).contains(&y) {
            return Err(WfError::index_out_of_range(
                "流向网格",
                CellId::from_xy(x, y).get(),
                CELL_COUNT,
            ));
        }
        let idx = (y - 1) as usize * GRID_COLS + (x - 1) as usize;
        Ok((self.next_x[idx], self.next_y[idx]))
    }

    /// 通用下游遍历
    ///
    /// 每步先记录候选单元，`stop` 命中时返回该单元；否则沿指针前进。
    /// 指针指向汇点时由 `at_sink` 决定结果。
    fn walk<F, G>(&self, start: CellId, mut stop: F, at_sink: G) -> WfResult<CellId>
    where
        F: FnMut(CellId) -> bool,
        G: FnOnce(CellId) -> WfResult<CellId>,
    {
        let (mut x, mut y) = start.grid_xy();

        for _ in 0..TRAVERSAL_LIMIT {
            let candidate = CellId::from_xy(x, y);
            if stop(candidate) {
                return Ok(candidate);
            }

            let (nx, ny) = self.next_of(x, y)?;
            if nx == SINK {
                return at_sink(candidate);
            }
            x = nx;
            y = ny;
        }

        Err(WfError::TraversalLimit {
            start: start.get(),
            limit: TRAVERSAL_LIMIT,
        })
    }

    /// 沿流向走到汇点，返回汇点前的最后一个单元（河口）
    pub fn downstream_cell_to_sink(&self, point: GeoPoint) -> WfResult<CellId> {
        let start = point.cell();
        let mouth = self.walk(start, |_| false, Ok)?;
        debug!("单元 {} 的河口单元: {}", start, mouth);
        Ok(mouth)
    }

    /// 沿流向走到第一个水库单元
    ///
    /// 起点本身若是水库单元则直接返回。走到汇点仍未遇到水库时返回数据错误。
    pub fn downstream_cell_to_reservoir(
        &self,
        point: GeoPoint,
        reservoirs: &ReservoirSet,
    ) -> WfResult<CellId> {
        let start = point.cell();
        let reservoir = self.walk(
            start,
            |c| reservoirs.contains(c),
            |last| {
                Err(WfError::data(format!(
                    "单元 {start} 下游直到汇点前的 {last} 都没有水库"
                )))
            },
        )?;
        debug!("单元 {} 的下游水库单元: {}", start, reservoir);
        Ok(reservoir)
    }

    /// 湿地出口单元：`(c mod 90 + 1) + ((floor(c / 90) + 1) * 90) + 1`
    pub fn wetlands_outlet_cell(point: GeoPoint) -> CellId {
        let (x, y) = point.cell().grid_xy();
        CellId::new(x + y * GRID_COLS as i64 + 1)
    }
}

/// 流向网络惰性缓存
///
/// 首次访问时加载，之后在进程生命周期内共享同一份只读网络。
#[derive(Debug)]
pub struct FlowNetworkCache {
    path: PathBuf,
    network: RwLock<Option<Arc<FlowNetwork>>>,
}

impl FlowNetworkCache {
    /// 创建缓存，不立即加载
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            network: RwLock::new(None),
        }
    }

    /// 流向表路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 是否已加载
    pub fn is_loaded(&self) -> bool {
        self.network.read().is_some()
    }

    /// 获取网络，未加载时加载；重复调用返回同一实例
    pub fn get_or_load(&self) -> WfResult<Arc<FlowNetwork>> {
        if let Some(network) = self.network.read().as_ref() {
            return Ok(Arc::clone(network));
        }

        let mut guard = self.network.write();
        if let Some(network) = guard.as_ref() {
            return Ok(Arc::clone(network));
        }

        let network = Arc::new(FlowNetwork::load(&self.path)?);
        *guard = Some(Arc::clone(&network));
        Ok(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn all_sinks() -> (Vec<i64>, Vec<i64>) {
        (vec![SINK; CELL_COUNT], vec![SINK; CELL_COUNT])
    }

    fn set_next(nx: &mut [i64], ny: &mut [i64], from: (i64, i64), to: (i64, i64)) {
        let idx = (from.1 - 1) as usize * GRID_COLS + (from.0 - 1) as usize;
        nx[idx] = to.0;
        ny[idx] = to.1;
    }

    fn point() -> GeoPoint {
        GeoPoint::new(33.0, -100.0).unwrap()
    }

    #[test]
    fn test_sink_at_start() {
        let (nx, ny) = all_sinks();
        let net = FlowNetwork::from_vectors(nx, ny).unwrap();
        let (x, y) = point().cell().grid_xy();
        assert_eq!(
            net.downstream_cell_to_sink(point()).unwrap(),
            CellId::from_xy(x, y)
        );
    }

    #[test]
    fn test_follow_chain_to_sink() {
        let (mut nx, mut ny) = all_sinks();
        let (x, y) = point().cell().grid_xy();
        set_next(&mut nx, &mut ny, (x, y), (x + 1, y));
        set_next(&mut nx, &mut ny, (x + 1, y), (x + 1, y + 1));
        let net = FlowNetwork::from_vectors(nx, ny).unwrap();
        assert_eq!(
            net.downstream_cell_to_sink(point()).unwrap(),
            CellId::from_xy(x + 1, y + 1)
        );
    }

    #[test]
    fn test_cycle_hits_traversal_limit() {
        let (mut nx, mut ny) = all_sinks();
        let (x, y) = point().cell().grid_xy();
        set_next(&mut nx, &mut ny, (x, y), (x + 1, y));
        set_next(&mut nx, &mut ny, (x + 1, y), (x, y));
        let net = FlowNetwork::from_vectors(nx, ny).unwrap();

        let err = net.downstream_cell_to_sink(point()).unwrap_err();
        assert!(matches!(err, WfError::TraversalLimit { limit, .. } if limit == CELL_COUNT + 1));

        let reservoirs = ReservoirSet::default();
        assert!(net
            .downstream_cell_to_reservoir(point(), &reservoirs)
            .is_err());
    }

    #[test]
    fn test_pointer_outside_grid() {
        let (mut nx, mut ny) = all_sinks();
        let (x, y) = point().cell().grid_xy();
        set_next(&mut nx, &mut ny, (x, y), (200, 3));
        let net = FlowNetwork::from_vectors(nx, ny).unwrap();
        assert!(matches!(
            net.downstream_cell_to_sink(point()),
            Err(WfError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_reservoir_walk() {
        let (mut nx, mut ny) = all_sinks();
        let (x, y) = point().cell().grid_xy();
        set_next(&mut nx, &mut ny, (x, y), (x + 1, y));
        set_next(&mut nx, &mut ny, (x + 1, y), (x + 2, y));
        let net = FlowNetwork::from_vectors(nx, ny).unwrap();

        let reservoirs = ReservoirSet::from_cells([CellId::from_xy(x + 1, y)]);
        assert_eq!(
            net.downstream_cell_to_reservoir(point(), &reservoirs).unwrap(),
            CellId::from_xy(x + 1, y)
        );

        let elsewhere = ReservoirSet::from_cells([CellId::new(1)]);
        assert!(net
            .downstream_cell_to_reservoir(point(), &elsewhere)
            .is_err());
    }

    #[test]
    fn test_wetlands_outlet_arithmetic() {
        let p = point();
        let c = p.cell().get();
        let expected = (c % 90 + 1) + ((c / 90 + 1) * 90) + 1;
        assert_eq!(FlowNetwork::wetlands_outlet_cell(p), CellId::new(expected));
    }

    #[test]
    fn test_load_and_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nextxy.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        for _ in 0..CELL_COUNT {
            writeln!(f, "-9999 -9999").unwrap();
        }
        drop(f);

        let cache = FlowNetworkCache::new(&path);
        assert!(!cache.is_loaded());
        let a = cache.get_or_load().unwrap();
        let b = cache.get_or_load().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(cache.is_loaded());
    }

    #[test]
    fn test_load_wrong_row_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nextxy.txt");
        std::fs::write(&path, "1 1\n2 1\n").unwrap();
        assert!(matches!(
            FlowNetwork::load(&path),
            Err(WfError::SizeMismatch { expected, actual: 2, .. }) if expected == CELL_COUNT
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let cache = FlowNetworkCache::new("/no/such/nextxy.txt");
        assert!(matches!(
            cache.get_or_load(),
            Err(WfError::FileNotFound { .. })
        ));
    }
}
