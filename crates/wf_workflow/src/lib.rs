// crates/wf_workflow/src/lib.rs

//! WetFlow 工作流层
//!
//! 管理修复前/修复后模型运行的生命周期，并为分析请求暂存模型输出。
//!
//! # 模块结构
//!
//! - [`job`]: 作业记录、状态和启动参数
//! - [`storage`]: 作业记录存储（内存 / JSON 文件）
//! - [`artifact`]: 制品存储
//! - [`process`]: 外部模型进程
//! - [`workspace`]: 请求级临时工作区
//! - [`events`]: 事件系统
//! - [`orchestrator`]: 作业编排器
//! - [`session`]: 分析会话
//!
//! # 示例
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wf_workflow::{JobOrchestrator, LaunchParams, LocalArtifactStore, MemoryJobStore,
//!     ModelKind, ShellLauncher};
//!
//! let orchestrator = JobOrchestrator::new(
//!     config,
//!     Arc::new(MemoryJobStore::new()),
//!     Arc::new(LocalArtifactStore::new("state/artifacts")?),
//!     ShellLauncher::new("sh", Vec::new()),
//! );
//! let outcome = orchestrator.launch(ModelKind::PreFlow, "run_a", &LaunchParams::years(1990, 1995))?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod artifact;
pub mod events;
pub mod job;
pub mod orchestrator;
pub mod process;
pub mod session;
pub mod storage;
pub mod workspace;

// 重导出核心类型
pub use artifact::{ArtifactError, ArtifactResult, ArtifactStore, LocalArtifactStore};
pub use events::{EventDispatcher, EventListener, FnListener, LoggingListener, WorkflowEvent};
pub use job::{JobId, JobRecord, JobStatus, LaunchParams, ModelKind};
pub use orchestrator::{JobOrchestrator, LaunchOutcome, WorkflowError, WorkflowResult};
pub use process::{ModelProcess, ProcessError, ShellLauncher};
pub use session::{
    AnalysisRequest, AnalysisSession, ArtifactRef, PEAK_FLOW_FIRST_YEAR, PEAK_FLOW_LAST_YEAR,
};
pub use storage::{
    FileJobStore, JobFilter, JobPatch, JobRecordStore, MemoryJobStore, StorageError,
    StorageResult,
};
pub use workspace::ScopedWorkspace;
