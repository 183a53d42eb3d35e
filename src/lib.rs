//! Intranet Install Agent - 内网服务一键安装代理
//!
//! 模块化的库入口

pub mod error;
pub mod middleware;
pub mod infra;
pub mod domain;
pub mod config;
pub mod state;
pub mod api;
pub mod services;

use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use config::EnvConfig;
use state::AppState;

/// 运行时配置（命令行参数覆盖环境变量）
#[derive(Debug, Default)]
pub struct RuntimeConfig {
    /// 覆盖监听端口
    pub port_override: Option<u16>,
    /// 覆盖 compose 文件路径
    pub compose_file_override: Option<PathBuf>,
}

/// 初始化并运行代理
pub async fn init_and_run_agent_with_config(runtime: RuntimeConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,intranet_install_agent=debug")),
        )
        .init();

    let mut config = EnvConfig::from_env();
    if let Some(port) = runtime.port_override {
        config.port = port;
    }
    if let Some(compose_file) = runtime.compose_file_override {
        config.compose_file = compose_file;
    }

    let port = config.port;
    let state = Arc::new(AppState::new(config));
    let app = api::router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind listener");
            std::process::exit(1);
        }
    };

    tracing::info!(addr = %addr, "Intranet install agent listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
    }
}

/// 等待关闭信号 (Ctrl+C)
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
