// crates/wf_analysis/src/context.rs

//! 流域上下文
//!
//! 持有流域配置，并惰性缓存流向网络与水库单元集合。
//! 细网格经纬度表与日期表按需读取，不缓存。

use std::sync::Arc;

use parking_lot::RwLock;
use wf_config::BasinConfig;
use wf_foundation::WfResult;
use wf_grid::{DateTable, FlowNetwork, FlowNetworkCache, LonLatTable, ReservoirSet};

/// 流域上下文
#[derive(Debug)]
pub struct BasinContext {
    config: BasinConfig,
    network: FlowNetworkCache,
    reservoirs: RwLock<Option<Arc<ReservoirSet>>>,
}

impl BasinContext {
    /// 创建上下文，不读取任何文件
    pub fn new(config: BasinConfig) -> Self {
        let network = FlowNetworkCache::new(config.resolve(&config.layout.flow_direction));
        Self {
            config,
            network,
            reservoirs: RwLock::new(None),
        }
    }

    /// 流域配置
    pub fn config(&self) -> &BasinConfig {
        &self.config
    }

    /// 流向网络（首次访问时加载）
    pub fn flow_network(&self) -> WfResult<Arc<FlowNetwork>> {
        self.network.get_or_load()
    }

    /// 水库单元集合（首次访问时加载）
    pub fn reservoirs(&self) -> WfResult<Arc<ReservoirSet>> {
        if let Some(set) = self.reservoirs.read().as_ref() {
            return Ok(Arc::clone(set));
        }

        let mut guard = self.reservoirs.write();
        if let Some(set) = guard.as_ref() {
            return Ok(Arc::clone(set));
        }
        let set = Arc::new(ReservoirSet::load(
            &self.config.resolve(&self.config.layout.reservoirs),
        )?);
        *guard = Some(Arc::clone(&set));
        Ok(set)
    }

    /// 细网格经纬度表
    pub fn lonlat(&self) -> WfResult<LonLatTable> {
        LonLatTable::load(&self.config.resolve(&self.config.layout.lonlat))
    }

    /// 日期表
    pub fn dates(&self) -> WfResult<DateTable> {
        DateTable::load(&self.config.resolve(&self.config.layout.dates))
    }
}
