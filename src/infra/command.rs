//! 命令执行器
//!
//! 提供带超时的简单命令执行，用于工具可用性探测等不需要实时日志的场景

use std::time::Duration;
use tokio::process::Command;

/// 命令执行错误
#[derive(Debug)]
pub enum CommandError {
    /// 命令启动失败
    SpawnFailed(std::io::Error),
    /// 命令超时
    Timeout,
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::SpawnFailed(e) => write!(f, "Failed to spawn command: {}", e),
            CommandError::Timeout => write!(f, "Command timed out"),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::SpawnFailed(e) => Some(e),
            CommandError::Timeout => None,
        }
    }
}

/// 命令执行器
pub struct CommandRunner;

impl CommandRunner {
    /// 执行简单命令，收集完整输出
    ///
    /// 超过 `timeout` 未完成则返回 `CommandError::Timeout`，不再等待
    pub async fn run_simple(
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<std::process::Output, CommandError> {
        let child = Command::new(program).args(args).output();

        tokio::select! {
            result = child => {
                result.map_err(CommandError::SpawnFailed)
            }
            _ = tokio::time::sleep(timeout) => {
                Err(CommandError::Timeout)
            }
        }
    }

    /// 探测某个命令能否成功执行（退出码为 0）
    ///
    /// 启动失败、非零退出和超时一律视为不可用
    pub async fn probe(program: &str, args: &[&str], timeout: Duration) -> bool {
        match Self::run_simple(program, args, timeout).await {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }
}
