//! 安装执行上下文
//!
//! 封装单个安装会话需要的状态和工具：会话标识、安装路径、状态通道、
//! 取消令牌

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::domain::install::{InstallOutcome, InstallPhase, InstallReport, LogLine};
use crate::state::AppState;

/// 安装执行上下文
#[derive(Clone)]
pub struct InstallContext {
    /// 会话 ID
    pub session_id: String,
    /// 用户选择的安装目录
    pub install_path: PathBuf,
    /// 应用状态
    pub state: Arc<AppState>,
    /// 取消令牌
    pub cancel_token: CancellationToken,
    /// 会话开始时间
    pub started_at: DateTime<Utc>,
}

impl InstallContext {
    /// 创建新的上下文
    pub fn new(
        session_id: String,
        install_path: PathBuf,
        state: Arc<AppState>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            session_id,
            install_path,
            state,
            cancel_token,
            started_at: Utc::now(),
        }
    }

    /// 发送编排器自身的进度信息
    pub fn log_status(&self, content: impl Into<String>) {
        self.state.status_log.append(LogLine::status(content));
    }

    /// 更新当前阶段
    pub async fn set_phase(&self, phase: InstallPhase) {
        self.state.set_phase(phase).await;
    }

    /// 检查是否被取消
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// 完成会话：记录报告、广播终态、释放会话槽
    ///
    /// 每个会话恰好调用一次
    pub async fn finish(&self, outcome: InstallOutcome) {
        let report = InstallReport {
            session_id: self.session_id.clone(),
            install_path: self.install_path.display().to_string(),
            started_at: self.started_at,
            finished_at: Utc::now(),
            outcome: outcome.clone(),
        };

        self.log_status(outcome.summary());
        let payload = serde_json::to_string(&outcome)
            .unwrap_or_else(|_| format!("{{\"result\":\"{}\"}}", outcome.as_str()));
        self.state.status_log.append(LogLine::result(payload));

        self.state.store_report(report).await;
        self.state.set_phase(InstallPhase::Finished).await;
        self.state.unregister_install().await;

        tracing::info!(
            session_id = %self.session_id,
            outcome = outcome.as_str(),
            "Install session finished"
        );
    }
}
