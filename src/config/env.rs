//! 环境变量配置加载

use std::env;
use std::path::PathBuf;

use crate::config::services::{default_registry, parse_registry, ServiceDescriptor};
use crate::services::health::PollPolicy;

/// 环境配置
#[derive(Clone, Debug)]
pub struct EnvConfig {
    /// API 密钥（安装向导调用变更类端点时需要）
    pub api_key: String,
    /// 服务监听端口
    pub port: u16,
    /// docker-compose.yml 路径
    pub compose_file: PathBuf,
    /// docker 可执行文件（测试中可替换）
    pub docker_bin: String,
    /// 旧版 docker-compose 可执行文件（compose 子命令不可用时的回退）
    pub compose_bin: String,
    /// 健康检查目标服务
    pub services: Vec<ServiceDescriptor>,
    /// 健康检查最大轮数
    pub health_max_attempts: u32,
    /// 健康检查轮间延迟（毫秒）
    pub health_round_delay_ms: u64,
    /// 单次探测超时（毫秒）
    pub health_probe_timeout_ms: u64,
}

impl EnvConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Self {
        let api_key = env::var("INSTALL_AGENT_API_KEY")
            .unwrap_or_else(|_| "change-me-in-production".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(9310);

        let compose_file = env::var("COMPOSE_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("server-services/docker-compose.yml"));

        let docker_bin = env::var("DOCKER_BIN").unwrap_or_else(|_| "docker".to_string());
        let compose_bin =
            env::var("COMPOSE_BIN").unwrap_or_else(|_| "docker-compose".to_string());

        let services = env::var("SERVICE_REGISTRY")
            .map(|v| parse_registry(&v))
            .ok()
            .filter(|list| !list.is_empty())
            .unwrap_or_else(default_registry);

        let health_max_attempts = env::var("HEALTH_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(15);

        let health_round_delay_ms = env::var("HEALTH_ROUND_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2000);

        let health_probe_timeout_ms = env::var("HEALTH_PROBE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2000);

        Self {
            api_key,
            port,
            compose_file,
            docker_bin,
            compose_bin,
            services,
            health_max_attempts,
            health_round_delay_ms,
            health_probe_timeout_ms,
        }
    }

    /// 健康检查轮询策略
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            max_attempts: self.health_max_attempts,
            round_delay: std::time::Duration::from_millis(self.health_round_delay_ms),
            probe_timeout: std::time::Duration::from_millis(self.health_probe_timeout_ms),
        }
    }

    /// compose 文件所在目录（第二个配置文件写入此处）
    pub fn compose_dir(&self) -> PathBuf {
        self.compose_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// 常量
pub mod constants {
    /// 预检查命令超时（秒）- 避免在损坏的 shell 上无限等待
    pub const PREFLIGHT_TIMEOUT_SECS: u64 = 5;

    /// 会话密钥注入子进程环境变量时使用的名称
    pub const SECRET_ENV_VAR: &str = "MONGO_PASS";

    /// 状态日志滚动窗口容量（仅保留最近 N 条）
    pub const STATUS_LOG_CAPACITY: usize = 200;

    /// 版本号
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}
