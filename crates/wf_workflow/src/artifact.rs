// crates/wf_workflow/src/artifact.rs

//! 制品存储
//!
//! 每个作业在制品存储中有一个同名文件夹，模型输出上传到这里，
//! 分析请求从这里下载栅格。本地实现把文件夹放在一个根目录下。

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// 制品存储错误
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// IO错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 文件夹或文件不存在
    #[error("Artifact not found: {0}")]
    NotFound(String),

    /// 文件夹已存在
    #[error("Artifact folder already exists: {0}")]
    AlreadyExists(String),

    /// 名称不合法
    #[error("Invalid artifact name: {0}")]
    InvalidName(String),
}

/// 制品存储结果类型
pub type ArtifactResult<T> = Result<T, ArtifactError>;

/// 制品存储 trait
pub trait ArtifactStore: Send + Sync {
    /// 文件夹是否存在
    fn exists(&self, folder: &str) -> ArtifactResult<bool>;

    /// 创建文件夹；已存在时报错
    fn create_folder(&self, folder: &str) -> ArtifactResult<()>;

    /// 删除文件夹及其内容，返回是否删除了文件夹
    fn delete_folder(&self, folder: &str) -> ArtifactResult<bool>;

    /// 下载文件到 `dest_root/folder/file`，返回本地路径
    fn download_file(&self, folder: &str, file: &str, dest_root: &Path) -> ArtifactResult<PathBuf>;

    /// 上传本地文件到文件夹，同名覆盖
    fn upload_file(&self, folder: &str, local: &Path) -> ArtifactResult<()>;
}

/// 单段名称校验
fn check_name(name: &str) -> ArtifactResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(ArtifactError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// 本地文件系统制品存储
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    /// 创建存储，根目录不存在时创建
    pub fn new(root: impl Into<PathBuf>) -> ArtifactResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// 根目录
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn folder_path(&self, folder: &str) -> ArtifactResult<PathBuf> {
        check_name(folder)?;
        Ok(self.root.join(folder))
    }
}

impl ArtifactStore for LocalArtifactStore {
    fn exists(&self, folder: &str) -> ArtifactResult<bool> {
        Ok(self.folder_path(folder)?.is_dir())
    }

    fn create_folder(&self, folder: &str) -> ArtifactResult<()> {
        let path = self.folder_path(folder)?;
        match std::fs::create_dir(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(ArtifactError::AlreadyExists(folder.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn delete_folder(&self, folder: &str) -> ArtifactResult<bool> {
        let path = self.folder_path(folder)?;
        if !path.is_dir() {
            return Ok(false);
        }
        std::fs::remove_dir_all(&path)?;
        Ok(true)
    }

    fn download_file(&self, folder: &str, file: &str, dest_root: &Path) -> ArtifactResult<PathBuf> {
        check_name(file)?;
        let source = self.folder_path(folder)?.join(file);
        if !source.is_file() {
            return Err(ArtifactError::NotFound(format!("/{folder}/{file}")));
        }

        let dest_dir = dest_root.join(folder);
        std::fs::create_dir_all(&dest_dir)?;
        let dest = dest_dir.join(file);
        std::fs::copy(&source, &dest)?;

        debug!("已下载 /{}/{} -> {}", folder, file, dest.display());
        Ok(dest)
    }

    fn upload_file(&self, folder: &str, local: &Path) -> ArtifactResult<()> {
        let dir = self.folder_path(folder)?;
        if !dir.is_dir() {
            return Err(ArtifactError::NotFound(format!("/{folder}")));
        }
        let name = local
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ArtifactError::InvalidName(local.display().to_string()))?;

        std::fs::copy(local, dir.join(name))?;
        debug!("已上传 {} -> /{}/{}", local.display(), folder, name);
        Ok(())
    }
}
