//! 安装会话领域模型

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::services::ServiceDescriptor;

/// 安装会话所处阶段
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstallPhase {
    Idle,
    Preflighting,
    Launching,
    AwaitingHealth,
    WritingConfig,
    Finished,
}

impl InstallPhase {
    /// 转换为字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallPhase::Idle => "idle",
            InstallPhase::Preflighting => "preflighting",
            InstallPhase::Launching => "launching",
            InstallPhase::AwaitingHealth => "awaiting_health",
            InstallPhase::WritingConfig => "writing_config",
            InstallPhase::Finished => "finished",
        }
    }
}

/// 单次探测的结果状态
///
/// 就 readiness 而言只有 Running 算成功，Timeout 与 Error 的区分仅供展示
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Running,
    Timeout,
    Error,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Running => "running",
            HealthStatus::Timeout => "timeout",
            HealthStatus::Error => "error",
        }
    }
}

/// 一次 TCP 探测的结果，每轮重新生成，不做持久化
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct HealthCheckResult {
    pub service: ServiceDescriptor,
    pub status: HealthStatus,
}

/// 安装失败的具体类别
///
/// 每个内部错误在其来源组件被捕获并包装为其中一种，不会有原始错误越过编排器边界
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InstallFailure {
    /// 宿主机缺少 docker 或 compose 插件
    Preflight { message: String },
    /// compose 进程无法启动（二进制缺失、权限不足）
    Spawn { error: String },
    /// compose 进程以非零码退出
    ProcessExit { exit_code: i32 },
    /// 重试预算耗尽仍未全部就绪，附带最后一轮各服务状态
    HealthTimeout { last_results: Vec<HealthCheckResult> },
    /// 服务已启动但配置文件写入失败，附带出错的路径
    ConfigWrite { path: String, error: String },
}

impl InstallFailure {
    /// 面向用户的一行摘要
    pub fn summary(&self) -> String {
        match self {
            InstallFailure::Preflight { message } => format!("Preflight failed: {}", message),
            InstallFailure::Spawn { error } => {
                format!("Could not start docker compose: {}", error)
            }
            InstallFailure::ProcessExit { exit_code } => {
                format!("docker compose exited with code {}", exit_code)
            }
            InstallFailure::HealthTimeout { last_results } => {
                let pending: Vec<String> = last_results
                    .iter()
                    .filter(|r| r.status != HealthStatus::Running)
                    .map(|r| format!("{} ({})", r.service.name, r.status.as_str()))
                    .collect();
                format!("Services did not respond in time: {}", pending.join(", "))
            }
            InstallFailure::ConfigWrite { path, error } => {
                format!("Failed to write configuration at {}: {}", path, error)
            }
        }
    }
}

/// 终态结果，编排器每个会话恰好产出一个
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum InstallOutcome {
    Succeeded,
    Failed { failure: InstallFailure },
    /// 用户主动取消，不视为错误
    Cancelled,
}

impl InstallOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallOutcome::Succeeded => "succeeded",
            InstallOutcome::Failed { .. } => "failed",
            InstallOutcome::Cancelled => "cancelled",
        }
    }

    /// 面向用户的终态摘要
    pub fn summary(&self) -> String {
        match self {
            InstallOutcome::Succeeded => "Installation completed successfully".to_string(),
            InstallOutcome::Failed { failure } => failure.summary(),
            InstallOutcome::Cancelled => "Installation cancelled".to_string(),
        }
    }
}

/// 会话终态报告
#[derive(Clone, Debug, Serialize)]
pub struct InstallReport {
    pub session_id: String,
    pub install_path: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: InstallOutcome,
}

/// 日志行
#[derive(Clone, Debug, Serialize)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    pub stream: String, // stdout | stderr | status | result
    pub content: String,
}

impl LogLine {
    /// 创建新日志行
    pub fn new(stream: &str, content: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            stream: stream.to_string(),
            content: content.into(),
        }
    }

    /// compose 进程的 stdout 行
    pub fn stdout(content: impl Into<String>) -> Self {
        Self::new("stdout", content)
    }

    /// compose 进程的 stderr 行
    pub fn stderr(content: impl Into<String>) -> Self {
        Self::new("stderr", content)
    }

    /// 编排器自身的进度信息
    pub fn status(content: impl Into<String>) -> Self {
        Self::new("status", content)
    }

    /// 终态事件（内容为序列化后的 InstallOutcome）
    pub fn result(content: impl Into<String>) -> Self {
        Self::new("result", content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_as_str() {
        assert_eq!(InstallOutcome::Succeeded.as_str(), "succeeded");
        assert_eq!(InstallOutcome::Cancelled.as_str(), "cancelled");
        let failed = InstallOutcome::Failed {
            failure: InstallFailure::ProcessExit { exit_code: 1 },
        };
        assert_eq!(failed.as_str(), "failed");
    }

    #[test]
    fn test_health_timeout_summary_lists_pending_services() {
        let failure = InstallFailure::HealthTimeout {
            last_results: vec![
                HealthCheckResult {
                    service: ServiceDescriptor::new("MongoDB", "localhost", 27017),
                    status: HealthStatus::Running,
                },
                HealthCheckResult {
                    service: ServiceDescriptor::new("Redis", "localhost", 6379),
                    status: HealthStatus::Error,
                },
            ],
        };
        let summary = failure.summary();
        assert!(summary.contains("Redis (error)"));
        assert!(!summary.contains("MongoDB"));
    }

    #[test]
    fn test_log_line_streams() {
        assert_eq!(LogLine::stdout("a").stream, "stdout");
        assert_eq!(LogLine::stderr("b").stream, "stderr");
        assert_eq!(LogLine::status("c").stream, "status");
        assert_eq!(LogLine::result("d").stream, "result");
    }

    #[test]
    fn test_failure_serializes_with_kind_tag() {
        let failure = InstallFailure::ConfigWrite {
            path: "/tmp/.env".to_string(),
            error: "permission denied".to_string(),
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["kind"], "config_write");
        assert_eq!(json["path"], "/tmp/.env");
    }
}
