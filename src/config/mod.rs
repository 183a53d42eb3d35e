//! 配置模块
//!
//! 环境变量解析与服务注册表

pub mod env;
pub mod services;

pub use env::EnvConfig;
pub use services::ServiceDescriptor;
