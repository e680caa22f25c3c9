// crates/wf_workflow/src/storage.rs

//! 作业记录存储
//!
//! 提供作业记录持久化的抽象和实现。存储本身负责两条约束：
//!
//! - 输出文件夹名唯一
//! - 至多一条记录处于 `running`
//!
//! 两条约束都在 [`JobRecordStore::insert_one`] 中原子检查，调用方的预检查只用于
//! 给出更好的结果，不能代替存储的约束。

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use thiserror::Error;

use crate::job::{JobId, JobRecord, JobStatus};

/// 存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 文件夹名已存在
    #[error("Folder already recorded: {0}")]
    DuplicateKey(String),

    /// 已有作业在运行
    #[error("Running slot taken by: {running}")]
    SlotTaken {
        /// 正在运行的作业文件夹名
        running: String,
    },

    /// 文件夹名不能作为存储键
    #[error("Invalid folder name: {0}")]
    InvalidKey(String),

    /// 其他错误
    #[error("{0}")]
    Other(String),
}

/// 存储结果类型
pub type StorageResult<T> = Result<T, StorageError>;

/// 查询条件，未设置的字段不参与匹配
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    /// 文件夹名
    pub folder_name: Option<String>,
    /// 状态
    pub status: Option<JobStatus>,
}

impl JobFilter {
    /// 匹配全部记录
    pub fn all() -> Self {
        Self::default()
    }

    /// 按文件夹名
    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            folder_name: Some(name.into()),
            status: None,
        }
    }

    /// 按状态
    pub fn status(status: JobStatus) -> Self {
        Self {
            folder_name: None,
            status: Some(status),
        }
    }

    /// 是否匹配
    pub fn matches(&self, record: &JobRecord) -> bool {
        self.folder_name
            .as_deref()
            .map_or(true, |f| f == record.folder_name)
            && self.status.map_or(true, |s| s == record.status)
    }
}

/// 记录更新
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobPatch {
    /// 新状态
    pub status: Option<JobStatus>,
}

impl JobPatch {
    /// 只更新状态
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
        }
    }

    fn apply(&self, record: &mut JobRecord) {
        if let Some(status) = self.status {
            record.set_status(status);
        }
    }
}

/// 作业记录存储 trait
pub trait JobRecordStore: Send + Sync {
    /// 查找第一条匹配记录（按创建时间）
    fn find_one(&self, filter: &JobFilter) -> StorageResult<Option<JobRecord>> {
        Ok(self.find_many(filter)?.into_iter().next())
    }

    /// 查找全部匹配记录，按创建时间排序
    fn find_many(&self, filter: &JobFilter) -> StorageResult<Vec<JobRecord>>;

    /// 原子插入
    ///
    /// 文件夹名重复返回 [`StorageError::DuplicateKey`]；记录为 `running` 且已有
    /// 运行中的作业时返回 [`StorageError::SlotTaken`]。失败时不留下任何记录。
    fn insert_one(&self, record: &JobRecord) -> StorageResult<()>;

    /// 更新记录，返回更新后的记录；不存在时返回 `None`
    fn update_one(&self, id: JobId, patch: &JobPatch) -> StorageResult<Option<JobRecord>>;

    /// 删除记录，返回是否删除了记录
    fn delete_one(&self, id: JobId) -> StorageResult<bool>;

    /// 释放没有对应运行中记录的运行槽，返回是否释放
    ///
    /// 插入过程中进程中断会留下这样的运行槽，之后每次启动都报告忙。
    /// 内存存储不会出现这种状态。
    fn release_orphaned_slot(&self) -> StorageResult<bool> {
        Ok(false)
    }
}

fn sorted(mut records: Vec<JobRecord>) -> Vec<JobRecord> {
    records.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.folder_name.cmp(&b.folder_name))
    });
    records
}

/// 内存存储
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
}

impl MemoryJobStore {
    /// 创建新的内存存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取当前记录数量
    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }
}

fn running_other(jobs: &HashMap<JobId, JobRecord>, except: JobId) -> Option<&JobRecord> {
    jobs.values()
        .find(|r| r.status == JobStatus::Running && r.id != except)
}

impl JobRecordStore for MemoryJobStore {
    fn find_many(&self, filter: &JobFilter) -> StorageResult<Vec<JobRecord>> {
        let jobs = self.jobs.read();
        Ok(sorted(
            jobs.values().filter(|r| filter.matches(r)).cloned().collect(),
        ))
    }

    fn insert_one(&self, record: &JobRecord) -> StorageResult<()> {
        let mut jobs = self.jobs.write();

        if jobs.values().any(|r| r.folder_name == record.folder_name) {
            return Err(StorageError::DuplicateKey(record.folder_name.clone()));
        }
        if record.status == JobStatus::Running {
            if let Some(running) = running_other(&jobs, record.id) {
                return Err(StorageError::SlotTaken {
                    running: running.folder_name.clone(),
                });
            }
        }

        jobs.insert(record.id, record.clone());
        Ok(())
    }

    fn update_one(&self, id: JobId, patch: &JobPatch) -> StorageResult<Option<JobRecord>> {
        let mut jobs = self.jobs.write();

        if patch.status == Some(JobStatus::Running) {
            if let Some(running) = running_other(&jobs, id) {
                return Err(StorageError::SlotTaken {
                    running: running.folder_name.clone(),
                });
            }
        }

        Ok(jobs.get_mut(&id).map(|record| {
            patch.apply(record);
            record.clone()
        }))
    }

    fn delete_one(&self, id: JobId) -> StorageResult<bool> {
        Ok(self.jobs.write().remove(&id).is_some())
    }
}

/// 文件存储
///
/// 目录布局：
///
/// ```text
/// <dir>/<id>.json        作业记录
/// <dir>/folders/<name>   文件夹名键，内容为作业ID
/// <dir>/running.slot     运行槽，内容为运行中作业的ID
/// ```
///
/// 键文件与运行槽都以 `create_new` 独占创建，跨进程同样有效。
#[derive(Debug)]
pub struct FileJobStore {
    /// 存储目录
    dir: PathBuf,
    /// 内存缓存
    cache: RwLock<HashMap<JobId, JobRecord>>,
}

impl FileJobStore {
    /// 创建新的文件存储，加载现有记录到缓存
    pub fn new(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(dir.join("folders"))?;

        let storage = Self {
            dir,
            cache: RwLock::new(HashMap::new()),
        };
        storage.load_all_to_cache()?;
        Ok(storage)
    }

    /// 获取存储目录
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: JobId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn key_path(&self, folder_name: &str) -> StorageResult<PathBuf> {
        let valid = !folder_name.is_empty()
            && folder_name != "."
            && folder_name != ".."
            && !folder_name.contains(['/', '\\']);
        if !valid {
            return Err(StorageError::InvalidKey(folder_name.to_string()));
        }
        Ok(self.dir.join("folders").join(folder_name))
    }

    fn slot_path(&self) -> PathBuf {
        self.dir.join("running.slot")
    }

    /// 加载所有记录到缓存
    fn load_all_to_cache(&self) -> StorageResult<()> {
        let mut cache = self.cache.write();
        cache.clear();

        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                match load_from_file(&path) {
                    Ok(record) => {
                        cache.insert(record.id, record);
                    }
                    Err(e) => tracing::warn!("跳过无法解析的作业记录 {}: {}", path.display(), e),
                }
            }
        }
        Ok(())
    }

    fn save_to_file(&self, record: &JobRecord) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        std::fs::write(self.record_path(record.id), json)?;
        Ok(())
    }

    /// 独占创建并写入 ID；已存在时返回 `Ok(false)`
    fn create_exclusive(path: &Path, id: JobId) -> StorageResult<bool> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                file.write_all(id.to_string().as_bytes())?;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// 占用运行槽；已被占用时返回占用者的文件夹名
    fn acquire_slot(
        &self,
        cache: &HashMap<JobId, JobRecord>,
        id: JobId,
    ) -> StorageResult<Option<String>> {
        let slot = self.slot_path();
        if Self::create_exclusive(&slot, id)? {
            return Ok(None);
        }

        let holder = std::fs::read_to_string(&slot)?;
        let holder = holder.trim();
        let running = holder
            .parse::<JobId>()
            .ok()
            .and_then(|h| cache.get(&h))
            .map(|r| r.folder_name.clone())
            .unwrap_or_else(|| holder.to_string());
        Ok(Some(running))
    }

    /// 释放运行槽（仅当由 `id` 持有）
    fn release_slot(&self, id: JobId) -> StorageResult<()> {
        let slot = self.slot_path();
        match std::fs::read_to_string(&slot) {
            Ok(holder) if holder.trim() == id.to_string() => {
                std::fs::remove_file(&slot)?;
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn remove_if_exists(path: &Path) -> StorageResult<()> {
        match std::fs::remove_file(path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// 从文件加载记录
fn load_from_file(path: &Path) -> StorageResult<JobRecord> {
    let json = std::fs::read_to_string(path)?;
    serde_json::from_str(&json).map_err(|e| StorageError::Serialization(e.to_string()))
}

impl JobRecordStore for FileJobStore {
    fn find_many(&self, filter: &JobFilter) -> StorageResult<Vec<JobRecord>> {
        let cache = self.cache.read();
        Ok(sorted(
            cache.values().filter(|r| filter.matches(r)).cloned().collect(),
        ))
    }

    fn insert_one(&self, record: &JobRecord) -> StorageResult<()> {
        let mut cache = self.cache.write();

        let key = self.key_path(&record.folder_name)?;
        if !Self::create_exclusive(&key, record.id)? {
            return Err(StorageError::DuplicateKey(record.folder_name.clone()));
        }

        if record.status == JobStatus::Running {
            match self.acquire_slot(&cache, record.id) {
                Ok(None) => {}
                Ok(Some(running)) => {
                    Self::remove_if_exists(&key)?;
                    return Err(StorageError::SlotTaken { running });
                }
                Err(e) => {
                    Self::remove_if_exists(&key)?;
                    return Err(e);
                }
            }
        }

        if let Err(e) = self.save_to_file(record) {
            if record.status == JobStatus::Running {
                self.release_slot(record.id)?;
            }
            Self::remove_if_exists(&key)?;
            return Err(e);
        }

        cache.insert(record.id, record.clone());
        Ok(())
    }

    fn update_one(&self, id: JobId, patch: &JobPatch) -> StorageResult<Option<JobRecord>> {
        let mut cache = self.cache.write();

        let Some(mut record) = cache.get(&id).cloned() else {
            return Ok(None);
        };
        let old_status = record.status;
        patch.apply(&mut record);

        if record.status == JobStatus::Running && old_status != JobStatus::Running {
            if let Some(running) = self.acquire_slot(&cache, id)? {
                return Err(StorageError::SlotTaken { running });
            }
        }

        self.save_to_file(&record)?;
        if old_status == JobStatus::Running && record.status != JobStatus::Running {
            self.release_slot(id)?;
        }

        cache.insert(id, record.clone());
        Ok(Some(record))
    }

    fn delete_one(&self, id: JobId) -> StorageResult<bool> {
        let mut cache = self.cache.write();

        let Some(record) = cache.remove(&id) else {
            return Ok(false);
        };

        Self::remove_if_exists(&self.record_path(id))?;
        if let Ok(key) = self.key_path(&record.folder_name) {
            Self::remove_if_exists(&key)?;
        }
        if record.status == JobStatus::Running {
            self.release_slot(id)?;
        }
        Ok(true)
    }

    fn release_orphaned_slot(&self) -> StorageResult<bool> {
        let mut cache = self.cache.write();

        let slot = self.slot_path();
        let holder = match std::fs::read_to_string(&slot) {
            Ok(holder) => holder.trim().to_string(),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        // 以磁盘为准，缓存可能落后于其他进程
        let record = match holder.parse::<JobId>() {
            Ok(id) => match load_from_file(&self.record_path(id)) {
                Ok(record) => Some(record),
                Err(StorageError::Io(e)) if e.kind() == ErrorKind::NotFound => None,
                Err(e) => return Err(e),
            },
            Err(_) => None,
        };

        match record {
            Some(record) if record.status == JobStatus::Running => {
                cache.insert(record.id, record);
                return Ok(false);
            }
            Some(record) => {
                cache.insert(record.id, record);
            }
            None => {
                // 同一次插入留下的文件夹名键
                for entry in std::fs::read_dir(self.dir.join("folders"))? {
                    let path = entry?.path();
                    if std::fs::read_to_string(&path)?.trim() == holder {
                        Self::remove_if_exists(&path)?;
                    }
                }
            }
        }

        Self::remove_if_exists(&slot)?;
        tracing::warn!("已释放无主运行槽: {}", holder);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::ModelKind;

    fn create_test_record(folder: &str) -> JobRecord {
        JobRecord::running(folder, ModelKind::PreFlow, serde_json::json!({}))
    }

    fn check_constraints(store: &dyn JobRecordStore) {
        let a = create_test_record("run_a");
        store.insert_one(&a).unwrap();

        // 第二个运行中的作业
        let b = create_test_record("run_b");
        assert!(matches!(
            store.insert_one(&b),
            Err(StorageError::SlotTaken { running }) if running == "run_a"
        ));
        assert_eq!(store.find_many(&JobFilter::all()).unwrap().len(), 1);

        // 文件夹名重复
        let mut dup = create_test_record("run_a");
        dup.status = JobStatus::Completed;
        assert!(matches!(
            store.insert_one(&dup),
            Err(StorageError::DuplicateKey(_))
        ));

        // 完成后释放运行槽
        let updated = store
            .update_one(a.id, &JobPatch::status(JobStatus::Completed))
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, JobStatus::Completed);
        store.insert_one(&b).unwrap();

        let running = store
            .find_one(&JobFilter::status(JobStatus::Running))
            .unwrap()
            .unwrap();
        assert_eq!(running.folder_name, "run_b");

        // 删除后文件夹名可以复用
        assert!(store.delete_one(a.id).unwrap());
        assert!(!store.delete_one(a.id).unwrap());
        let mut again = create_test_record("run_a");
        again.status = JobStatus::Error;
        store.insert_one(&again).unwrap();

        assert!(store
            .update_one(JobId::new(), &JobPatch::status(JobStatus::Error))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_memory_store_constraints() {
        check_constraints(&MemoryJobStore::new());
    }

    #[test]
    fn test_file_store_constraints() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileJobStore::new(temp_dir.path()).unwrap();
        check_constraints(&store);
    }

    #[test]
    fn test_file_store_reload() {
        let temp_dir = tempfile::tempdir().unwrap();
        let record = create_test_record("run_a");
        {
            let store = FileJobStore::new(temp_dir.path()).unwrap();
            store.insert_one(&record).unwrap();
            assert!(temp_dir.path().join(format!("{}.json", record.id)).exists());
            assert!(temp_dir.path().join("running.slot").exists());
        }

        let store = FileJobStore::new(temp_dir.path()).unwrap();
        let loaded = store.find_one(&JobFilter::folder("run_a")).unwrap().unwrap();
        assert_eq!(loaded.id, record.id);

        // 运行槽跨实例保留
        assert!(matches!(
            store.insert_one(&create_test_record("run_b")),
            Err(StorageError::SlotTaken { running }) if running == "run_a"
        ));

        assert!(store.delete_one(record.id).unwrap());
        assert!(!temp_dir.path().join("running.slot").exists());
        assert!(!temp_dir.path().join("folders").join("run_a").exists());
    }

    #[test]
    fn test_file_store_releases_orphaned_slot() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileJobStore::new(temp_dir.path()).unwrap();

        // 键与运行槽已写入，记录未保存
        let lost = JobId::new();
        std::fs::write(temp_dir.path().join("running.slot"), lost.to_string()).unwrap();
        std::fs::write(temp_dir.path().join("folders").join("run_a"), lost.to_string()).unwrap();
        assert!(matches!(
            store.insert_one(&create_test_record("run_b")),
            Err(StorageError::SlotTaken { .. })
        ));

        assert!(store.release_orphaned_slot().unwrap());
        assert!(!temp_dir.path().join("running.slot").exists());
        assert!(!temp_dir.path().join("folders").join("run_a").exists());

        let a = create_test_record("run_a");
        store.insert_one(&a).unwrap();
        // 持有者有运行中的记录时保留
        assert!(!store.release_orphaned_slot().unwrap());
        assert!(temp_dir.path().join("running.slot").exists());
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileJobStore::new(temp_dir.path()).unwrap();
        assert!(matches!(
            store.insert_one(&create_test_record("../escape")),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_filter_matches() {
        let record = create_test_record("run_a");
        assert!(JobFilter::all().matches(&record));
        assert!(JobFilter::folder("run_a").matches(&record));
        assert!(!JobFilter::folder("run_b").matches(&record));
        assert!(!JobFilter::status(JobStatus::Completed).matches(&record));
    }
}
