// crates/wf_workflow/src/workspace.rs

//! 请求级临时工作区
//!
//! 暂存下载的栅格。工作区随值的生命周期存在，离开作用域时删除，
//! 无论请求成功、出错还是提前返回。

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// 临时工作区
#[derive(Debug)]
pub struct ScopedWorkspace {
    dir: TempDir,
}

impl ScopedWorkspace {
    /// 在 `root` 下创建；`root` 为 `None` 时使用系统临时目录
    pub fn create(root: Option<&Path>) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("wetflow-");
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        Ok(Self { dir })
    }

    /// 工作区路径
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// 工作区内的路径
    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let ws = ScopedWorkspace::create(Some(root.path())).unwrap();
            std::fs::write(ws.join("x.bin"), [0u8; 4]).unwrap();
            assert!(ws.path().starts_with(root.path()));
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_removed_on_error_path() {
        fn failing(root: &Path) -> Result<(), (PathBuf, std::io::Error)> {
            let ws = ScopedWorkspace::create(Some(root)).map_err(|e| (root.to_path_buf(), e))?;
            let p = ws.path().to_path_buf();
            std::fs::read(ws.join("missing")).map_err(|e| (p, e))?;
            Ok(())
        }

        let root = tempfile::tempdir().unwrap();
        let (path, _) = failing(root.path()).unwrap_err();
        assert!(!path.exists());
    }
}
