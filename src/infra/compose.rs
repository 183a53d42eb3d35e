//! Docker Compose invocation form
//!
//! The command shape differs by platform: Windows goes through the command
//! shell with the `docker compose` subcommand, other platforms invoke the
//! standalone `docker-compose` binary directly. Resolved once at startup,
//! never branched on inside the supervising loop.

use std::path::Path;

/// 平台相关的 compose 调用形式
#[derive(Clone, Debug)]
pub struct ComposeInvocation {
    /// 程序名
    pub program: String,
    /// `up` 等子命令之前的基础参数
    pub base_args: Vec<String>,
}

impl ComposeInvocation {
    /// 按当前平台解析调用形式
    #[cfg(windows)]
    pub fn resolve(_compose_bin: &str) -> Self {
        Self {
            program: "cmd".to_string(),
            base_args: vec!["/C".to_string(), "docker".to_string(), "compose".to_string()],
        }
    }

    /// 按当前平台解析调用形式
    #[cfg(not(windows))]
    pub fn resolve(compose_bin: &str) -> Self {
        Self {
            program: compose_bin.to_string(),
            base_args: Vec::new(),
        }
    }

    /// 组装 `up -d` 命令行
    pub fn up_command(&self, compose_file: &Path) -> (String, Vec<String>) {
        let mut args = self.base_args.clone();
        args.push("-f".to_string());
        args.push(compose_file.display().to_string());
        args.push("up".to_string());
        args.push("-d".to_string());
        (self.program.clone(), args)
    }
}
