//! 服务层模块
//!
//! 包含安装编排的核心业务逻辑

pub mod config_writer;
pub mod health;
pub mod install;
pub mod preflight;
pub mod secret;
