// crates/wf_raster/src/raster.rs

//! 平铺 f32 栅格
//!
//! # 文件格式
//!
//! 无文件头，连续的小端 f32。按日分块：第 `day` 天、块内偏移 `i` 的值位于
//! `i + stride * day`。对流域网格，`stride = CELL_COUNT`，块内偏移为 `cell mod 5490`。
//!
//! # 写入
//!
//! 所有写入先写到同目录下的临时文件再重命名，读者不会看到半写的栅格。
//! 补丁操作在整份栅格读入成功之前不会写任何东西。

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;
use wf_foundation::{WfError, WfResult};
use wf_grid::{days_in_year, CellId, CELL_COUNT};

/// 流量截断阈值，超过该值视为无效值置 0
pub const CLIP_THRESHOLD: f32 = 100_000.0;

/// 整份栅格
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Raster {
    values: Vec<f32>,
}

impl Raster {
    /// 从值数组创建
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// 以常数填充
    pub fn filled(len: usize, value: f32) -> Self {
        Self {
            values: vec![value; len],
        }
    }

    /// 解码字节；长度必须是 4 的倍数
    pub fn decode(bytes: &[u8]) -> WfResult<Self> {
        if bytes.len() % 4 != 0 {
            return Err(WfError::data(format!(
                "栅格字节数 {} 不是 4 的倍数",
                bytes.len()
            )));
        }
        let values = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self { values })
    }

    /// 编码为小端字节
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.values.len() * 4);
        for v in &self.values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    /// 读取整份栅格
    pub fn read(path: &Path) -> WfResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| WfError::io_at(path, e))?;
        Self::decode(&bytes).map_err(|e| match e {
            WfError::Data { message } => WfError::data(format!("{}: {}", path.display(), message)),
            other => other,
        })
    }

    /// 原子写入：同目录临时文件 + 重命名
    pub fn write(&self, path: &Path) -> WfResult<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(parent).map_err(|e| WfError::io_at(parent, e))?;
        tmp.write_all(&self.encode())
            .map_err(|e| WfError::io_at(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| WfError::io_at(tmp.path(), e))?;
        tmp.persist(path).map_err(|e| WfError::io_at(path, e.error))?;

        debug!("栅格已写入: {} ({} 个值)", path.display(), self.values.len());
        Ok(())
    }

    /// 将所有大于 `threshold` 的值置 0
    pub fn clip_above(&mut self, threshold: f32) {
        for v in &mut self.values {
            if *v > threshold {
                *v = 0.0;
            }
        }
    }

    /// 值个数
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 只读值
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// 可变值
    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    /// 取出值数组
    pub fn into_values(self) -> Vec<f32> {
        self.values
    }

    /// 按日分块抽取偏移 `index` 的序列
    fn extract(&self, index: usize, stride: usize, days: usize) -> Vec<f32> {
        (0..days).map(|day| self.values[index + stride * day]).collect()
    }
}

/// 读取某网格单元一整年的逐日序列
///
/// 记录数必须恰为 `CELL_COUNT * days_in_year(year)`。`clip` 为真时先对整份栅格截断。
pub fn read_year_series(path: &Path, cell: CellId, year: i32, clip: bool) -> WfResult<Vec<f32>> {
    read_point_series(
        path,
        cell.raster_offset(),
        CELL_COUNT,
        days_in_year(year),
        clip,
    )
}

/// 读取任意块大小栅格中偏移 `index` 的 `days` 天序列
pub fn read_point_series(
    path: &Path,
    index: usize,
    stride: usize,
    days: usize,
    clip: bool,
) -> WfResult<Vec<f32>> {
    if index >= stride {
        return Err(WfError::index_out_of_range("栅格块内", index as i64, stride));
    }

    let mut raster = Raster::read(path)?;
    WfError::check_size(&path.display().to_string(), stride * days, raster.len())?;

    if clip {
        raster.clip_above(CLIP_THRESHOLD);
    }
    Ok(raster.extract(index, stride, days))
}

/// 单元补丁
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellPatch {
    /// 覆盖为给定值
    Set(f32),
    /// 叠加给定增量
    Add(f32),
}

impl CellPatch {
    #[inline]
    fn apply(self, value: &mut f32) {
        match self {
            Self::Set(v) => *value = v,
            Self::Add(v) => *value += v,
        }
    }
}

/// 对栅格每个日块中的若干偏移打补丁，返回日块数
///
/// 栅格长度必须是 `stride` 的正整数倍，所有偏移必须小于 `stride`。
pub fn patch_cells(
    path: &Path,
    stride: usize,
    updates: &BTreeMap<usize, CellPatch>,
) -> WfResult<usize> {
    if stride == 0 {
        return Err(WfError::validation("栅格块大小不能为 0"));
    }
    if let Some((&index, _)) = updates.iter().find(|&(&i, _)| i >= stride) {
        return Err(WfError::index_out_of_range("栅格块内", index as i64, stride));
    }

    let mut raster = Raster::read(path)?;
    if raster.is_empty() || raster.len() % stride != 0 {
        return Err(WfError::data(format!(
            "{}: 记录数 {} 不是块大小 {} 的正整数倍",
            path.display(),
            raster.len(),
            stride
        )));
    }

    let blocks = raster.len() / stride;
    for block in raster.values_mut().chunks_exact_mut(stride) {
        for (&index, &patch) in updates {
            patch.apply(&mut block[index]);
        }
    }

    raster.write(path)?;
    debug!(
        "栅格补丁: {} ({} 个偏移 × {} 个日块)",
        path.display(),
        updates.len(),
        blocks
    );
    Ok(blocks)
}

/// 只读文件元数据，检查栅格是否由整数个大小为 `stride` 的块组成
///
/// 返回块数。文件不存在时为 `FileNotFound`。
pub fn check_block_file(path: &Path, stride: usize) -> WfResult<usize> {
    if stride == 0 {
        return Err(WfError::validation("栅格块大小不能为 0"));
    }
    let bytes = std::fs::metadata(path)
        .map_err(|e| WfError::io_at(path, e))?
        .len() as usize;
    let width = std::mem::size_of::<f32>();
    if bytes % width != 0 {
        return Err(WfError::data(format!(
            "{}: 文件大小 {} 不是 {} 字节的整数倍",
            path.display(),
            bytes,
            width
        )));
    }
    let len = bytes / width;
    if len == 0 || len % stride != 0 {
        return Err(WfError::data(format!(
            "{}: 记录数 {} 不是块大小 {} 的正整数倍",
            path.display(),
            len,
            stride
        )));
    }
    Ok(len / stride)
}

/// 按网格单元覆盖值，块大小为 `CELL_COUNT`
pub fn patch_grid_cells(path: &Path, updates: &HashMap<CellId, f32>) -> WfResult<usize> {
    let by_offset: BTreeMap<usize, CellPatch> = updates
        .iter()
        .map(|(cell, &v)| (cell.raster_offset(), CellPatch::Set(v)))
        .collect();
    patch_cells(path, CELL_COUNT, &by_offset)
}
