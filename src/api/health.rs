//! 健康检查 API
//!
//! 包含 /health 端点

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::config::env::constants::VERSION;
use crate::state::AppState;

/// 健康检查响应
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: String,
    /// 当前安装阶段
    phase: String,
    /// 是否有安装会话在运行
    install_active: bool,
    uptime_seconds: i64,
}

/// 创建健康检查路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}

/// 健康检查
///
/// GET /health
/// 无需认证，用于存活探测
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let phase = state.phase().await;
    let uptime = Utc::now() - state.started_at;

    Json(HealthResponse {
        status: "ok",
        service: "intranet-install-agent",
        version: VERSION,
        timestamp: Utc::now().to_rfc3339(),
        phase: phase.as_str().to_string(),
        install_active: state.has_running_install().await,
        uptime_seconds: uptime.num_seconds(),
    })
}
