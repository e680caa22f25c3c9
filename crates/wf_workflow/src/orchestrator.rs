// crates/wf_workflow/src/orchestrator.rs

//! 作业编排模块
//!
//! 负责修复前/修复后模型运行的启动、查询、删除、完成与恢复。
//!
//! 同一时刻最多一个作业处于运行状态，文件夹名全局唯一。两条约束由
//! [`JobRecordStore::insert_one`] 原子保证；启动前的预检只用于尽早给出
//! 友好结果，不作为正确性依据。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use wf_analysis::update_roughness;
use wf_config::{BasinConfig, ConfigError};
use wf_foundation::WfError;

use crate::artifact::{ArtifactError, ArtifactStore};
use crate::events::{EventDispatcher, WorkflowEvent};
use crate::job::{JobRecord, JobStatus, LaunchParams, ModelKind};
use crate::process::{ModelProcess, ProcessError};
use crate::storage::{JobFilter, JobPatch, JobRecordStore, StorageError};

/// 脚本模板中的起始年份占位符
pub const START_YEAR_PLACEHOLDER: &str = "<SYEAR>";

/// 脚本模板中的结束年份占位符
pub const END_YEAR_PLACEHOLDER: &str = "<EYEAR>";

/// 模型输出文件扩展名
pub const OUTPUT_EXTENSION: &str = "bin";

/// 工作流错误
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// 分析或数据错误
    #[error(transparent)]
    Wf(#[from] WfError),

    /// 存储错误
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// 制品存储错误
    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    /// 进程启动错误
    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    /// 配置错误
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// 作业或文件夹不存在
    #[error("Not found: {0}")]
    NotFound(String),

    /// 状态冲突
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// 工作流结果类型
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// 启动请求的结果
#[derive(Debug, Clone)]
pub enum LaunchOutcome {
    /// 已启动
    Launched(JobRecord),
    /// 已有作业在运行，未创建新记录
    Busy {
        /// 运行中作业的文件夹名
        running: String,
    },
    /// 文件夹名已被占用，未创建新记录
    AlreadyExists {
        /// 请求的文件夹名
        folder: String,
    },
}

impl LaunchOutcome {
    /// 是否已启动
    pub fn is_launched(&self) -> bool {
        matches!(self, Self::Launched(_))
    }
}

/// 作业编排器
pub struct JobOrchestrator<S, A, P>
where
    S: JobRecordStore,
    A: ArtifactStore,
    P: ModelProcess,
{
    config: BasinConfig,
    store: Arc<S>,
    artifacts: Arc<A>,
    process: P,
    events: EventDispatcher,
}

impl<S, A, P> JobOrchestrator<S, A, P>
where
    S: JobRecordStore,
    A: ArtifactStore,
    P: ModelProcess,
{
    /// 创建编排器
    pub fn new(config: BasinConfig, store: Arc<S>, artifacts: Arc<A>, process: P) -> Self {
        Self {
            config,
            store,
            artifacts,
            process,
            events: EventDispatcher::new(),
        }
    }

    /// 获取事件分发器
    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    /// 获取流域配置
    pub fn config(&self) -> &BasinConfig {
        &self.config
    }

    /// 获取作业存储
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// 启动一次模型运行
    ///
    /// 修复后运行必须携带糙率情景，修复前运行不接受。
    pub fn launch(
        &self,
        model: ModelKind,
        folder: &str,
        params: &LaunchParams,
    ) -> WorkflowResult<LaunchOutcome> {
        if folder.trim().is_empty() {
            return Err(WfError::validation("文件夹名不能为空").into());
        }
        if params.start_year > params.end_year {
            return Err(WfError::validation(format!(
                "起始年份 {} 晚于结束年份 {}",
                params.start_year, params.end_year
            ))
            .into());
        }
        let (start, end) = self.config.job.clamp_years(params.start_year, params.end_year);
        if start > end {
            return Err(WfError::validation(format!(
                "年份区间 {}-{} 不在支持范围 {}-{} 内",
                params.start_year,
                params.end_year,
                self.config.job.first_year,
                self.config.job.last_year
            ))
            .into());
        }
        match (model, &params.roughness) {
            (ModelKind::PostFlow, None) => {
                return Err(WfError::validation("修复后运行缺少糙率情景参数").into());
            }
            (ModelKind::PreFlow, Some(_)) => {
                return Err(WfError::validation("修复前运行不接受糙率情景参数").into());
            }
            _ => {}
        }

        if let Some(running) = self.store.find_one(&JobFilter::status(JobStatus::Running))? {
            tracing::info!("Launch of '{}' rejected: '{}' is running", folder, running.folder_name);
            return Ok(LaunchOutcome::Busy {
                running: running.folder_name,
            });
        }
        if self.store.find_one(&JobFilter::folder(folder))?.is_some()
            || self.artifacts.exists(folder)?
        {
            return Ok(LaunchOutcome::AlreadyExists {
                folder: folder.to_string(),
            });
        }

        let metadata = serde_json::to_value(params)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let record = JobRecord::running(folder, model, metadata);
        match self.store.insert_one(&record) {
            Ok(()) => {}
            Err(StorageError::SlotTaken { running }) => {
                return Ok(LaunchOutcome::Busy { running });
            }
            Err(StorageError::DuplicateKey(folder)) => {
                return Ok(LaunchOutcome::AlreadyExists { folder });
            }
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = self.start(&record, params) {
            self.fail(&record, &e);
            return Err(e);
        }

        self.events.emit(WorkflowEvent::JobLaunched {
            job_id: record.id,
            folder_name: record.folder_name.clone(),
            model,
        });
        Ok(LaunchOutcome::Launched(record))
    }

    /// 创建制品文件夹、准备输入并启动进程
    fn start(&self, record: &JobRecord, params: &LaunchParams) -> WorkflowResult<()> {
        match self.artifacts.create_folder(&record.folder_name) {
            Ok(()) => {}
            Err(ArtifactError::AlreadyExists(folder)) => {
                return Err(WorkflowError::Conflict(format!("制品文件夹已存在: {folder}")));
            }
            Err(e) => return Err(e.into()),
        }

        let script = self.render_script(record.model, params.start_year, params.end_year)?;

        if let Some(update) = &params.roughness {
            update_roughness(&self.config, update)?;
        }

        let pid = self.process.launch(&script)?;
        tracing::info!(
            "Job {} ({}) started as pid {} from {}",
            record.id,
            record.model,
            pid,
            script.display()
        );
        Ok(())
    }

    /// 渲染模型脚本，年份夹到支持范围内
    pub fn render_script(
        &self,
        model: ModelKind,
        start_year: i32,
        end_year: i32,
    ) -> WorkflowResult<PathBuf> {
        let (start, end) = self.config.job.clamp_years(start_year, end_year);
        if start > end {
            return Err(WfError::validation(format!(
                "年份区间 {start_year}-{end_year} 不在支持范围 {}-{} 内",
                self.config.job.first_year, self.config.job.last_year
            ))
            .into());
        }

        let tag = model.script_tag();
        let template_path = self.config.template_path(tag);
        let template = std::fs::read_to_string(&template_path)
            .map_err(|e| WfError::io_at(&template_path, e))?;

        let script = template
            .replace(START_YEAR_PLACEHOLDER, &start.to_string())
            .replace(END_YEAR_PLACEHOLDER, &end.to_string());

        let script_path = self.config.script_path(tag);
        std::fs::write(&script_path, script).map_err(|e| WfError::io_at(&script_path, e))?;
        tracing::debug!("Rendered {} for years {}-{}", script_path.display(), start, end);
        Ok(script_path)
    }

    /// 查询文件夹对应作业的状态
    pub fn status(&self, folder: &str) -> WorkflowResult<Option<JobStatus>> {
        Ok(self
            .store
            .find_one(&JobFilter::folder(folder))?
            .map(|r| r.status))
    }

    /// 列出全部作业，按创建时间排序
    pub fn list(&self) -> WorkflowResult<Vec<JobRecord>> {
        Ok(self.store.find_many(&JobFilter::all())?)
    }

    /// 删除作业记录及其制品文件夹
    ///
    /// 两者都不存在时返回 [`WorkflowError::NotFound`]。
    pub fn remove(&self, folder: &str) -> WorkflowResult<()> {
        let record = self.store.find_one(&JobFilter::folder(folder))?;
        let folder_exists = self.artifacts.exists(folder)?;
        if record.is_none() && !folder_exists {
            return Err(WorkflowError::NotFound(folder.to_string()));
        }

        let record_deleted = match &record {
            Some(r) => self.store.delete_one(r.id)?,
            None => false,
        };
        let folder_deleted = folder_exists && self.artifacts.delete_folder(folder)?;

        self.events.emit(WorkflowEvent::JobRemoved {
            folder_name: folder.to_string(),
            record_deleted,
            folder_deleted,
        });
        Ok(())
    }

    /// 完成钩子：上传运行中作业的输出并标记完成
    ///
    /// 上传失败时作业转为错误状态并返回错误。
    pub fn complete_running(&self, output_dir: &Path) -> WorkflowResult<JobRecord> {
        let record = self
            .store
            .find_one(&JobFilter::status(JobStatus::Running))?
            .ok_or_else(|| WorkflowError::NotFound("运行中的作业".to_string()))?;

        match self.upload_outputs(&record.folder_name, output_dir) {
            Ok(uploaded) => {
                let updated = self.transition(&record, JobStatus::Completed)?;
                self.events.emit(WorkflowEvent::JobCompleted {
                    job_id: record.id,
                    uploaded,
                });
                Ok(updated)
            }
            Err(e) => {
                self.fail(&record, &e);
                Err(e)
            }
        }
    }

    /// 恢复钩子：运行中的作业标记为错误并删除其制品文件夹
    ///
    /// 没有运行中的作业时返回 `None`，同时释放没有记录的运行槽。
    pub fn recover(&self) -> WorkflowResult<Option<JobRecord>> {
        let Some(record) = self.store.find_one(&JobFilter::status(JobStatus::Running))? else {
            if self.store.release_orphaned_slot()? {
                tracing::warn!("Released running slot with no job record");
            }
            return Ok(None);
        };

        let updated = self.transition(&record, JobStatus::Error)?;
        let folder_deleted = self.artifacts.delete_folder(&record.folder_name)?;
        tracing::warn!(
            "Recovered job {} in '{}' (artifacts deleted: {})",
            record.id,
            record.folder_name,
            folder_deleted
        );
        Ok(Some(updated))
    }

    /// 上传输出目录中的全部 `.bin` 文件，按文件名顺序
    fn upload_outputs(&self, folder: &str, output_dir: &Path) -> WorkflowResult<usize> {
        let entries =
            std::fs::read_dir(output_dir).map_err(|e| WfError::io_at(output_dir, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| WfError::io_at(output_dir, e))?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == OUTPUT_EXTENSION) {
                files.push(path);
            }
        }
        files.sort();

        for file in &files {
            self.artifacts.upload_file(folder, file)?;
        }
        tracing::info!("Uploaded {} outputs to '{}'", files.len(), folder);
        Ok(files.len())
    }

    /// 更新状态并发送状态变更事件
    fn transition(&self, record: &JobRecord, status: JobStatus) -> WorkflowResult<JobRecord> {
        let updated = self
            .store
            .update_one(record.id, &JobPatch::status(status))?
            .ok_or_else(|| WorkflowError::NotFound(record.id.to_string()))?;

        if record.status != status {
            self.events.emit(WorkflowEvent::JobStatusChanged {
                job_id: record.id,
                old_status: record.status,
                new_status: status,
            });
        }
        Ok(updated)
    }

    /// 标记失败；状态更新本身出错时只记录日志
    fn fail(&self, record: &JobRecord, error: &WorkflowError) {
        if let Err(e) = self.transition(record, JobStatus::Error) {
            tracing::error!("Failed to mark job {} as error: {}", record.id, e);
        }
        self.events.emit(WorkflowEvent::JobFailed {
            job_id: record.id,
            error: error.to_string(),
        });
    }
}

impl<S, A, P> std::fmt::Debug for JobOrchestrator<S, A, P>
where
    S: JobRecordStore,
    A: ArtifactStore,
    P: ModelProcess,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobOrchestrator")
            .field("base_path", &self.config.base_path)
            .field("events", &self.events)
            .finish()
    }
}
