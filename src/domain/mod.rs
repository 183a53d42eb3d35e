//! 领域模型模块

pub mod install;
