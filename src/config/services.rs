//! 服务探测目标注册表
//!
//! 健康检查的目标服务列表（名称/主机/端口），启动时加载，运行期间不变

use serde::{Deserialize, Serialize};

/// 服务描述符
///
/// 标识一个需要验证可达性的服务端点，身份由 (host, port) 决定
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// 服务名称（仅用于展示）
    pub name: String,
    /// 主机地址
    pub host: String,
    /// TCP 端口
    pub port: u16,
}

impl ServiceDescriptor {
    /// 创建新的服务描述符
    pub fn new(name: &str, host: &str, port: u16) -> Self {
        Self {
            name: name.to_string(),
            host: host.to_string(),
            port,
        }
    }

    /// 返回 host:port 形式的端点字符串
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 默认注册表：安装栈自带的五个服务
pub fn default_registry() -> Vec<ServiceDescriptor> {
    vec![
        ServiceDescriptor::new("MongoDB", "localhost", 27017),
        ServiceDescriptor::new("Redis", "localhost", 6379),
        ServiceDescriptor::new("MinIO API", "localhost", 9000),
        ServiceDescriptor::new("MinIO Console", "localhost", 9001),
        ServiceDescriptor::new("ChromaDB", "localhost", 8000),
    ]
}

/// 解析注册表配置字符串
///
/// 格式: "Name:host:port,Name2:host2:port2"，无法解析的条目会被跳过
pub fn parse_registry(raw: &str) -> Vec<ServiceDescriptor> {
    raw.split(',')
        .filter_map(|entry| {
            let entry = entry.trim();
            if entry.is_empty() {
                return None;
            }
            let mut parts = entry.splitn(3, ':');
            let name = parts.next()?.trim();
            let host = parts.next()?.trim();
            let port: u16 = parts.next()?.trim().parse().ok()?;
            if name.is_empty() || host.is_empty() {
                tracing::warn!(entry = %entry, "Skipping malformed service registry entry");
                return None;
            }
            Some(ServiceDescriptor::new(name, host, port))
        })
        .collect()
}
