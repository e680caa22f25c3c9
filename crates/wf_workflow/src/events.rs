// crates/wf_workflow/src/events.rs

//! 事件系统模块
//!
//! 作业生命周期中的每次状态变化都会广播一个 [`WorkflowEvent`]。

use crate::job::{JobId, JobStatus, ModelKind};
use parking_lot::RwLock;
use std::sync::Arc;

/// 工作流事件
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    /// 作业已启动
    JobLaunched {
        /// 作业ID
        job_id: JobId,
        /// 输出文件夹名
        folder_name: String,
        /// 模型种类
        model: ModelKind,
    },
    /// 作业已完成
    JobCompleted {
        /// 作业ID
        job_id: JobId,
        /// 上传的输出文件数
        uploaded: usize,
    },
    /// 作业失败
    JobFailed {
        /// 作业ID
        job_id: JobId,
        /// 错误信息
        error: String,
    },
    /// 作业已删除
    JobRemoved {
        /// 输出文件夹名
        folder_name: String,
        /// 是否删除了作业记录
        record_deleted: bool,
        /// 是否删除了制品文件夹
        folder_deleted: bool,
    },
    /// 作业状态变更
    JobStatusChanged {
        /// 作业ID
        job_id: JobId,
        /// 旧状态
        old_status: JobStatus,
        /// 新状态
        new_status: JobStatus,
    },
}

impl WorkflowEvent {
    /// 获取事件对应的作业ID
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            Self::JobLaunched { job_id, .. } => Some(*job_id),
            Self::JobCompleted { job_id, .. } => Some(*job_id),
            Self::JobFailed { job_id, .. } => Some(*job_id),
            Self::JobRemoved { .. } => None,
            Self::JobStatusChanged { job_id, .. } => Some(*job_id),
        }
    }

    /// 获取事件名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::JobLaunched { .. } => "JobLaunched",
            Self::JobCompleted { .. } => "JobCompleted",
            Self::JobFailed { .. } => "JobFailed",
            Self::JobRemoved { .. } => "JobRemoved",
            Self::JobStatusChanged { .. } => "JobStatusChanged",
        }
    }
}

/// 事件监听器trait
pub trait EventListener: Send + Sync {
    /// 处理事件
    fn on_event(&self, event: &WorkflowEvent);

    /// 获取监听器名称 (用于调试)
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// 函数式事件监听器
pub struct FnListener<F>
where
    F: Fn(&WorkflowEvent) + Send + Sync,
{
    name: String,
    handler: F,
}

impl<F> FnListener<F>
where
    F: Fn(&WorkflowEvent) + Send + Sync,
{
    /// 创建函数式监听器
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

impl<F> EventListener for FnListener<F>
where
    F: Fn(&WorkflowEvent) + Send + Sync,
{
    fn on_event(&self, event: &WorkflowEvent) {
        (self.handler)(event);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// 日志事件监听器
pub struct LoggingListener {
    /// 日志前缀
    prefix: String,
}

impl LoggingListener {
    /// 创建日志监听器
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl EventListener for LoggingListener {
    fn on_event(&self, event: &WorkflowEvent) {
        match event {
            WorkflowEvent::JobLaunched {
                job_id,
                folder_name,
                model,
            } => {
                tracing::info!("{}: Job {} ({}) launched into '{}'", self.prefix, job_id, model, folder_name);
            }
            WorkflowEvent::JobCompleted { job_id, uploaded } => {
                tracing::info!("{}: Job {} completed ({} outputs uploaded)", self.prefix, job_id, uploaded);
            }
            WorkflowEvent::JobFailed { job_id, error } => {
                tracing::error!("{}: Job {} failed: {}", self.prefix, job_id, error);
            }
            WorkflowEvent::JobRemoved {
                folder_name,
                record_deleted,
                folder_deleted,
            } => {
                tracing::info!(
                    "{}: Folder '{}' removed (record: {}, artifacts: {})",
                    self.prefix,
                    folder_name,
                    record_deleted,
                    folder_deleted
                );
            }
            WorkflowEvent::JobStatusChanged {
                job_id,
                old_status,
                new_status,
            } => {
                tracing::info!("{}: Job {} status: {} -> {}", self.prefix, job_id, old_status, new_status);
            }
        }
    }

    fn name(&self) -> &str {
        "LoggingListener"
    }
}

/// 事件分发器
#[derive(Default)]
pub struct EventDispatcher {
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
}

impl EventDispatcher {
    /// 创建新的事件分发器
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// 添加监听器
    pub fn add_listener(&self, listener: Arc<dyn EventListener>) {
        let name = listener.name().to_string();
        self.listeners.write().push(listener);
        tracing::debug!("Added event listener: {}", name);
    }

    /// 添加函数式监听器
    pub fn add_fn_listener<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(&WorkflowEvent) + Send + Sync + 'static,
    {
        let listener = Arc::new(FnListener::new(name, handler));
        self.add_listener(listener);
    }

    /// 分发事件
    pub fn emit(&self, event: WorkflowEvent) {
        let listeners = self.listeners.read();

        tracing::trace!("Emitting event: {}", event.name());

        for listener in listeners.iter() {
            listener.on_event(&event);
        }
    }

    /// 获取监听器数量
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listener_count", &self.listener_count())
            .finish()
    }
}
