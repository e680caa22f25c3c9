// crates/wf_workflow/src/job.rs

//! 作业记录
//!
//! 一个作业对应一次外部模型运行，以输出文件夹名唯一标识。
//! 状态机：`absent → running → {completed, error}`，删除后回到 absent。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wf_analysis::RoughnessUpdate;

/// 作业ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    /// 创建新的作业ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// 获取内部UUID
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// 模型种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    /// 修复前基准运行
    #[serde(rename = "preflow")]
    PreFlow,
    /// 修复后情景运行
    #[serde(rename = "postflow")]
    PostFlow,
}

impl ModelKind {
    /// 记录中的名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreFlow => "preflow",
            Self::PostFlow => "postflow",
        }
    }

    /// 脚本模板中 `{model}` 的取值
    pub fn script_tag(&self) -> &'static str {
        match self {
            Self::PreFlow => "pre",
            Self::PostFlow => "post",
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 作业状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// 运行中
    Running,
    /// 已完成
    Completed,
    /// 失败
    Error,
}

impl JobStatus {
    /// 是否为终止状态
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// 启动参数，作为作业元数据原样保存
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchParams {
    /// 起始年份（请求值，渲染脚本时夹取）
    pub start_year: i32,
    /// 结束年份（请求值，渲染脚本时夹取）
    pub end_year: i32,
    /// 糙率情景，仅修复后运行使用
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roughness: Option<RoughnessUpdate>,
}

impl LaunchParams {
    /// 只有年份区间的参数
    pub fn years(start_year: i32, end_year: i32) -> Self {
        Self {
            start_year,
            end_year,
            roughness: None,
        }
    }
}

/// 作业记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// 作业ID
    pub id: JobId,
    /// 输出文件夹名（唯一）
    pub folder_name: String,
    /// 模型种类
    pub model: ModelKind,
    /// 状态
    pub status: JobStatus,
    /// 启动参数
    pub metadata: serde_json::Value,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// 创建运行中的作业记录
    pub fn running(
        folder_name: impl Into<String>,
        model: ModelKind,
        metadata: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            folder_name: folder_name.into(),
            model,
            status: JobStatus::Running,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }

    /// 更新状态与更新时间
    pub fn set_status(&mut self, status: JobStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&JobStatus::Running).unwrap(), "\"running\"");
        assert_eq!(serde_json::to_string(&JobStatus::Error).unwrap(), "\"error\"");
        assert!(JobStatus::Completed.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn test_model_kind_names() {
        assert_eq!(serde_json::to_string(&ModelKind::PreFlow).unwrap(), "\"preflow\"");
        assert_eq!(
            serde_json::from_str::<ModelKind>("\"postflow\"").unwrap(),
            ModelKind::PostFlow
        );
        assert_eq!(ModelKind::PostFlow.script_tag(), "post");
    }

    #[test]
    fn test_record_roundtrip() {
        let params = LaunchParams::years(1990, 1995);
        let record = JobRecord::running(
            "run_a",
            ModelKind::PreFlow,
            serde_json::to_value(&params).unwrap(),
        );
        let json = serde_json::to_string(&record).unwrap();
        let back: JobRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, record.id);
        assert_eq!(back.folder_name, "run_a");
        assert_eq!(back.status, JobStatus::Running);
        assert_eq!(back.metadata["start_year"], 1990);
        assert!(back.metadata.get("roughness").is_none());
    }

    #[test]
    fn test_job_id_parse() {
        let id = JobId::new();
        assert_eq!(id.to_string().parse::<JobId>().unwrap(), id);
    }
}
