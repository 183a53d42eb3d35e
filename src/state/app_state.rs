//! 应用状态

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::config::env::constants::STATUS_LOG_CAPACITY;
use crate::config::EnvConfig;
use crate::domain::install::{InstallPhase, InstallReport};
use crate::infra::ComposeInvocation;

use super::status_log::StatusLog;

/// 运行中的安装会话信息
pub struct RunningInstall {
    pub session_id: String,
    pub cancel_token: CancellationToken,
}

/// 应用状态
///
/// 同一时刻至多存在一个安装会话；重入在注册处被拒绝
pub struct AppState {
    /// 环境配置
    pub config: EnvConfig,
    /// 平台相关的 compose 调用形式（启动时解析一次）
    pub compose: ComposeInvocation,
    /// 服务启动时间
    pub started_at: DateTime<Utc>,
    /// 状态通道
    pub status_log: StatusLog,
    /// 当前阶段
    pub phase: RwLock<InstallPhase>,
    /// 当前运行中的会话
    pub current: RwLock<Option<RunningInstall>>,
    /// 最近一次会话的终态报告
    pub last_report: RwLock<Option<InstallReport>>,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(config: EnvConfig) -> Self {
        let compose = ComposeInvocation::resolve(&config.compose_bin);

        tracing::info!(
            port = config.port,
            compose_file = %config.compose_file.display(),
            compose_program = %compose.program,
            service_count = config.services.len(),
            "Loaded configuration"
        );

        Self {
            config,
            compose,
            started_at: Utc::now(),
            status_log: StatusLog::new(STATUS_LOG_CAPACITY),
            phase: RwLock::new(InstallPhase::Idle),
            current: RwLock::new(None),
            last_report: RwLock::new(None),
        }
    }

    /// 是否有安装会话在运行
    pub async fn has_running_install(&self) -> bool {
        let current = self.current.read().await;
        current.is_some()
    }

    /// 注册新的安装会话
    ///
    /// 已有会话在运行时返回 None（重入保护），否则清空上一轮的状态
    /// 窗口并返回新会话的取消令牌
    pub async fn register_install(&self, session_id: &str) -> Option<CancellationToken> {
        let mut current = self.current.write().await;
        if current.is_some() {
            return None;
        }

        let cancel_token = CancellationToken::new();
        *current = Some(RunningInstall {
            session_id: session_id.to_string(),
            cancel_token: cancel_token.clone(),
        });
        drop(current);

        self.status_log.reset();
        self.set_phase(InstallPhase::Idle).await;
        Some(cancel_token)
    }

    /// 取消注册安装会话（到达终态时调用）
    pub async fn unregister_install(&self) {
        let mut current = self.current.write().await;
        *current = None;
    }

    /// 请求取消当前会话
    ///
    /// 幂等：没有会话在运行时返回 false。取消是协作式的，置位后由
    /// 各组件在自身的挂起点观察
    pub async fn cancel_install(&self) -> bool {
        let current = self.current.read().await;
        if let Some(install) = current.as_ref() {
            install.cancel_token.cancel();
            true
        } else {
            false
        }
    }

    /// 当前会话 ID
    pub async fn current_session_id(&self) -> Option<String> {
        let current = self.current.read().await;
        current.as_ref().map(|i| i.session_id.clone())
    }

    /// 更新当前阶段
    pub async fn set_phase(&self, phase: InstallPhase) {
        let mut current = self.phase.write().await;
        *current = phase;
    }

    /// 读取当前阶段
    pub async fn phase(&self) -> InstallPhase {
        *self.phase.read().await
    }

    /// 记录终态报告
    pub async fn store_report(&self, report: InstallReport) {
        let mut last = self.last_report.write().await;
        *last = Some(report);
    }
}
