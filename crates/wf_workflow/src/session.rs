// crates/wf_workflow/src/session.rs

//! 分析会话
//!
//! 每次分析请求把引用的栅格从制品存储下载到一个临时工作区，
//! 在本地副本上运行分析，返回时工作区随之删除。

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use wf_analysis::{
    annual_peak_at, compare_flow_table, delta_at_three_sites, reservoir_hydrograph,
    return_period_year, weekly_minimum_delta_at, wetland_hydrograph, BasinContext, FlowRow,
    Hydrograph, ScenarioConfig, SiteDeltas, SUPPORTED_RETURN_PERIODS,
};
use wf_foundation::WfError;
use wf_grid::GeoPoint;

use crate::artifact::ArtifactStore;
use crate::orchestrator::{WorkflowError, WorkflowResult};
use crate::workspace::ScopedWorkspace;

/// 洪峰统计使用的第一个输出年份
pub const PEAK_FLOW_FIRST_YEAR: i32 = 1916;

/// 洪峰统计使用的最后一个输出年份
pub const PEAK_FLOW_LAST_YEAR: i32 = 2010;

/// 制品引用 `/<folder>/<file>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// 文件夹名
    pub folder: String,
    /// 文件名
    pub file: String,
}

impl ArtifactRef {
    /// 创建引用
    pub fn new(folder: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            file: file.into(),
        }
    }
}

impl FromStr for ArtifactRef {
    type Err = WfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_prefix('/').unwrap_or(s);
        match trimmed.split_once('/') {
            Some((folder, file))
                if !folder.is_empty() && !file.is_empty() && !file.contains('/') =>
            {
                Ok(Self::new(folder, file))
            }
            _ => Err(WfError::validation(format!(
                "制品引用必须形如 /<folder>/<file>: '{s}'"
            ))),
        }
    }
}

impl std::fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}/{}", self.folder, self.file)
    }
}

/// 一次分析请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// 修复前栅格
    pub pre: ArtifactRef,
    /// 修复后栅格
    pub post: ArtifactRef,
    /// 分析年份
    pub year: i32,
    /// 分析位置
    pub point: GeoPoint,
}

/// 分析会话
pub struct AnalysisSession<A: ArtifactStore> {
    context: Arc<BasinContext>,
    artifacts: Arc<A>,
}

impl<A: ArtifactStore> AnalysisSession<A> {
    /// 创建会话
    pub fn new(context: Arc<BasinContext>, artifacts: Arc<A>) -> Self {
        Self { context, artifacts }
    }

    /// 流域上下文
    pub fn context(&self) -> &BasinContext {
        &self.context
    }

    fn workspace(&self) -> WorkflowResult<ScopedWorkspace> {
        let root: Option<PathBuf> = self
            .context
            .config()
            .storage
            .workspace_root
            .as_ref()
            .map(|p| self.context.config().resolve(p));
        ScopedWorkspace::create(root.as_deref()).map_err(|source| {
            WorkflowError::from(WfError::Io {
                message: "创建临时工作区失败".to_string(),
                source: Some(source),
            })
        })
    }

    /// 下载请求引用的两个栅格，返回工作区和本地情景
    ///
    /// 工作区必须存活到分析结束。
    fn stage(
        &self,
        request: &AnalysisRequest,
    ) -> WorkflowResult<(ScopedWorkspace, ScenarioConfig)> {
        let ws = self.workspace()?;
        let pre_raster =
            self.artifacts
                .download_file(&request.pre.folder, &request.pre.file, ws.path())?;
        let post_raster =
            self.artifacts
                .download_file(&request.post.folder, &request.post.file, ws.path())?;

        let scenario = ScenarioConfig {
            pre_raster,
            post_raster,
            year: request.year,
            point: request.point,
        };
        Ok((ws, scenario))
    }

    /// 湿地所在单元的过程线
    pub fn wetland_hydrograph(&self, request: &AnalysisRequest) -> WorkflowResult<Hydrograph> {
        let (_ws, scenario) = self.stage(request)?;
        Ok(wetland_hydrograph(&scenario)?)
    }

    /// 下游最近水库单元的过程线
    pub fn reservoir_hydrograph(&self, request: &AnalysisRequest) -> WorkflowResult<Hydrograph> {
        let (_ws, scenario) = self.stage(request)?;
        Ok(reservoir_hydrograph(&self.context, &scenario)?)
    }

    /// 三处洪峰差值
    pub fn site_deltas(&self, request: &AnalysisRequest) -> WorkflowResult<SiteDeltas> {
        let (_ws, scenario) = self.stage(request)?;
        Ok(delta_at_three_sites(&self.context, &scenario)?)
    }

    /// 湿地所在单元的周最小流量差
    pub fn weekly_delta(&self, request: &AnalysisRequest) -> WorkflowResult<f64> {
        let (_ws, scenario) = self.stage(request)?;
        Ok(weekly_minimum_delta_at(&scenario, scenario.point.cell())?)
    }

    /// 细网格逐日对比表
    pub fn compare_flow(&self, request: &AnalysisRequest) -> WorkflowResult<Vec<FlowRow>> {
        let (_ws, scenario) = self.stage(request)?;
        let lonlat = self.context.lonlat()?;
        let dates = self.context.dates()?;
        Ok(compare_flow_table(&scenario, &lonlat, &dates)?)
    }

    /// 某作业输出中最接近 T 年一遇洪峰的年份
    ///
    /// 逐年下载 `outflw{year}.bin`，取该单元年最大流量。
    /// 不支持的重现期直接返回 `None`，不下载任何文件。
    pub fn peak_flow_year(
        &self,
        folder: &str,
        point: GeoPoint,
        return_period: u32,
    ) -> WorkflowResult<Option<i32>> {
        if !SUPPORTED_RETURN_PERIODS.contains(&return_period) {
            return Ok(None);
        }

        let ws = self.workspace()?;
        let cell = point.cell();
        let mut peaks = BTreeMap::new();
        for year in PEAK_FLOW_FIRST_YEAR..=PEAK_FLOW_LAST_YEAR {
            let path = self
                .artifacts
                .download_file(folder, &format!("outflw{year}.bin"), ws.path())?;
            if let Some(peak) = annual_peak_at(&path, cell, year)? {
                peaks.insert(year, peak);
            }
            // 读完即删
            std::fs::remove_file(&path).map_err(|e| WfError::io_at(&path, e))?;
        }

        tracing::debug!("单元 {} 共 {} 年洪峰", cell, peaks.len());
        Ok(return_period_year(&peaks, return_period))
    }
}

impl<A: ArtifactStore> std::fmt::Debug for AnalysisSession<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisSession")
            .field("context", &self.context)
            .finish()
    }
}
