// crates/wf_workflow/src/process.rs

//! 外部模型进程
//!
//! 启动即返回，不等待也不观察进程退出。完成与失败由外部通过
//! 完成钩子和恢复钩子回写作业状态。

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::info;

/// 进程启动错误
#[derive(Debug, Error)]
pub enum ProcessError {
    /// 脚本不存在
    #[error("Script not found: {0}")]
    ScriptNotFound(PathBuf),

    /// 启动失败
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        /// 启动器程序
        program: String,
        /// 底层IO错误
        #[source]
        source: std::io::Error,
    },
}

/// 模型进程 trait
pub trait ModelProcess: Send + Sync {
    /// 异步启动脚本，返回进程ID
    fn launch(&self, script: &Path) -> Result<u32, ProcessError>;
}

/// 通过 shell 启动器运行脚本
///
/// 命令行为 `program [args...] <script>`，工作目录为脚本所在目录，
/// 标准输入输出全部丢弃。
#[derive(Debug, Clone)]
pub struct ShellLauncher {
    program: String,
    args: Vec<String>,
}

impl ShellLauncher {
    /// 创建启动器
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// 启动器程序
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl ModelProcess for ShellLauncher {
    fn launch(&self, script: &Path) -> Result<u32, ProcessError> {
        if !script.is_file() {
            return Err(ProcessError::ScriptNotFound(script.to_path_buf()));
        }
        // 工作目录切换后相对路径会失效
        let script = script
            .canonicalize()
            .map_err(|_| ProcessError::ScriptNotFound(script.to_path_buf()))?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(&script)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = script.parent() {
            command.current_dir(dir);
        }

        // 子进程句柄丢弃后进程继续运行
        let child = command.spawn().map_err(|source| ProcessError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let pid = child.id();
        info!("模型进程已启动: {} {} (pid {})", self.program, script.display(), pid);
        Ok(pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_script() {
        let launcher = ShellLauncher::new("sh", Vec::new());
        assert!(matches!(
            launcher.launch(Path::new("/no/such/script.sh")),
            Err(ProcessError::ScriptNotFound(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_relative_script_runs() {
        use std::time::{Duration, Instant};

        // 测试工作目录下的相对路径，与默认 base_path "." 的情形一致
        let dir = tempfile::tempdir_in(".").unwrap();
        let marker = dir.path().canonicalize().unwrap().join("ran.txt");
        let relative = Path::new(".")
            .join(dir.path().file_name().unwrap())
            .join("pre.sh");
        std::fs::write(&relative, format!("touch '{}'\n", marker.display())).unwrap();

        let launcher = ShellLauncher::new("sh", Vec::new());
        launcher.launch(&relative).unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        while !marker.exists() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(marker.exists());
    }

    #[test]
    fn test_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("run.sh");
        std::fs::write(&script, "exit 0\n").unwrap();

        let launcher = ShellLauncher::new("wetflow-no-such-launcher", Vec::new());
        assert!(matches!(
            launcher.launch(&script),
            Err(ProcessError::Spawn { .. })
        ));
    }
}
