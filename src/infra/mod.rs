//! 基础设施模块
//!
//! 封装外部依赖（命令执行、compose 调用形式、网络地址解析）

pub mod command;
pub mod compose;
pub mod network;

pub use command::CommandRunner;
pub use compose::ComposeInvocation;
