//! 运行时状态模块
//!
//! 管理应用状态与状态日志通道

pub mod app_state;
pub mod status_log;

pub use app_state::AppState;
pub use status_log::StatusLog;
