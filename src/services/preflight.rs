//! 安装前预检查
//!
//! 在执行任何有副作用的动作之前确认宿主机上的 docker 与 compose 插件
//! 可被调用。只看版本查询能否成功，不解析版本号。

use std::time::Duration;

use tracing::debug;

use crate::config::env::constants::PREFLIGHT_TIMEOUT_SECS;
use crate::infra::CommandRunner;

fn preflight_timeout() -> Duration {
    Duration::from_secs(PREFLIGHT_TIMEOUT_SECS)
}

/// docker 是否可用
pub async fn check_docker(docker_bin: &str) -> bool {
    let available = CommandRunner::probe(docker_bin, &["--version"], preflight_timeout()).await;
    debug!(docker_bin, available, "Docker preflight check");
    available
}

/// compose 是否可用
///
/// 先试 `docker compose` 子命令，失败时回退到旧版独立可执行文件，
/// 任一成功即视为可用
pub async fn check_compose(docker_bin: &str, compose_bin: &str) -> bool {
    if CommandRunner::probe(docker_bin, &["compose", "version"], preflight_timeout()).await {
        debug!("Compose available via `docker compose` subcommand");
        return true;
    }

    let legacy = CommandRunner::probe(compose_bin, &["--version"], preflight_timeout()).await;
    debug!(compose_bin, available = legacy, "Legacy docker-compose preflight check");
    legacy
}

#[cfg(test)]
mod tests {
    use super::*;

    // 预检查只关心命令能否成功退出，用通用命令代替 docker 做验证

    #[tokio::test]
    async fn test_check_docker_with_invocable_binary() {
        assert!(check_docker("true").await);
    }

    #[tokio::test]
    async fn test_check_docker_with_missing_binary() {
        assert!(!check_docker("definitely-not-a-real-binary-x").await);
    }

    #[tokio::test]
    async fn test_check_compose_falls_back_to_legacy_binary() {
        // 子命令形式失败（false 总以非零退出），回退路径成功
        assert!(check_compose("false", "true").await);
    }

    #[tokio::test]
    async fn test_check_compose_unavailable_when_both_fail() {
        assert!(!check_compose("false", "definitely-not-a-real-binary-x").await);
    }
}
