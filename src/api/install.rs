//! 安装管理 API
//!
//! 包含 /install/start, /install/cancel, /install/status,
//! /install/logs/stream 端点

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::broadcast;
use tracing::warn;

use crate::domain::install::{InstallReport, LogLine};
use crate::error::{ApiError, ApiResult};
use crate::middleware::RequireApiKey;
use crate::services::install::{self, InstallContext};
use crate::state::AppState;

/// 启动安装请求
#[derive(Debug, Clone, Deserialize)]
pub struct StartRequest {
    /// 用户选择的安装目录（生成的 .env 落在这里）
    pub install_path: String,
}

/// 启动安装响应
#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub session_id: String,
    pub status: String,
    pub stream_url: String,
}

/// 取消安装响应
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    /// 是否有会话被请求取消
    pub cancelled: bool,
}

/// 安装状态响应
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub phase: String,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_report: Option<InstallReport>,
    /// 最近的日志窗口快照
    pub recent_lines: Vec<LogLine>,
}

/// 创建安装管理路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/install/start", post(start_install))
        .route("/install/cancel", post(cancel_install))
        .route("/install/status", get(get_install_status))
        .route("/install/logs/stream", get(stream_logs))
}

/// 启动安装会话
///
/// POST /install/start
/// 需要 API Key
///
/// 注意：实际的编排逻辑在 services/install 模块中
/// 此 handler 仅负责请求验证和会话注册
async fn start_install(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartRequest>,
) -> ApiResult<impl IntoResponse> {
    if request.install_path.trim().is_empty() {
        return Err(ApiError::bad_request("install_path must not be empty"));
    }

    let session_id = uuid::Uuid::new_v4().to_string();

    // 重入保护：同一时刻只允许一个会话
    let cancel_token = state
        .register_install(&session_id)
        .await
        .ok_or_else(|| ApiError::conflict("An install session is already running"))?;

    let ctx = InstallContext::new(
        session_id.clone(),
        PathBuf::from(request.install_path.trim()),
        state.clone(),
        cancel_token,
    );

    tracing::info!(
        session_id = %session_id,
        install_path = %ctx.install_path.display(),
        "Install session started"
    );

    tokio::spawn(install::execute(ctx));

    Ok(Json(StartResponse {
        session_id,
        status: "running".to_string(),
        stream_url: "/install/logs/stream".to_string(),
    }))
}

/// 取消当前安装会话
///
/// POST /install/cancel
/// 需要 API Key
///
/// 幂等：没有会话在运行时返回 cancelled=false
async fn cancel_install(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let cancelled = state.cancel_install().await;
    if cancelled {
        tracing::info!("Install cancellation requested");
    }
    Ok(Json(CancelResponse { cancelled }))
}

/// 查询安装状态
///
/// GET /install/status
async fn get_install_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let phase = state.phase().await;
    let session_id = state.current_session_id().await;
    let last_report = state.last_report.read().await.clone();

    Json(StatusResponse {
        phase: phase.as_str().to_string(),
        active: session_id.is_some(),
        session_id,
        last_report,
        recent_lines: state.status_log.snapshot(),
    })
}

/// SSE 日志流
///
/// GET /install/logs/stream
///
/// 先回放窗口快照，再转发实时日志；收到 result 流的行时发送
/// complete 事件并结束
async fn stream_logs(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // 先订阅再取快照，避免两者之间的日志丢失（重复可容忍）
    let mut rx = state.status_log.subscribe();
    let snapshot = state.status_log.snapshot();

    let stream = async_stream::stream! {
        for line in snapshot {
            if let Some(event) = line_to_event(&line) {
                yield Ok(event);
            }
            if line.stream == "result" {
                return;
            }
        }

        loop {
            match rx.recv().await {
                Ok(line) => {
                    let is_terminal = line.stream == "result";
                    if let Some(event) = line_to_event(&line) {
                        yield Ok(event);
                    }
                    if is_terminal {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(lagged = n, "Log subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

/// 将日志行转换为 SSE 事件
///
/// result 流承载序列化后的终态，作为 complete 事件发出
fn line_to_event(line: &LogLine) -> Option<Event> {
    if line.stream == "result" {
        return Some(Event::default().event("complete").data(line.content.clone()));
    }
    let json = serde_json::to_string(line).ok()?;
    Some(Event::default().data(json))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_to_event_marks_result_as_complete() {
        let line = LogLine::result("{\"result\":\"succeeded\"}");
        let event = line_to_event(&line);
        assert!(event.is_some());

        let line = LogLine::status("Checking Docker installation...");
        assert!(line_to_event(&line).is_some());
    }
}
