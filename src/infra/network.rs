//! 本机地址解析
//!
//! 生成的配置文件需要一个局域网内其他机器可达的地址。取第一个非回环的
//! IPv4 地址，取不到时回退到 `localhost`。纯函数，由编排器调用一次后
//! 把结果传给 ConfigWriter。

use std::net::Ipv4Addr;
use std::str::FromStr;

/// 解析本机对外 IPv4 地址
pub fn detect_host_ip() -> String {
    detect_interface_ip().unwrap_or_else(|| "localhost".to_string())
}

#[cfg(target_os = "linux")]
fn detect_interface_ip() -> Option<String> {
    let output = std::process::Command::new("hostname").arg("-I").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .split_whitespace()
        .find(|candidate| is_routable_ipv4(candidate))
        .map(|ip| ip.to_string())
}

#[cfg(target_os = "windows")]
fn detect_interface_ip() -> Option<String> {
    let output = std::process::Command::new("ipconfig").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in stdout.lines() {
        if line.contains("IPv4") {
            if let Some(ip) = line.split(':').nth(1) {
                let ip = ip.trim();
                if is_routable_ipv4(ip) {
                    return Some(ip.to_string());
                }
            }
        }
    }
    None
}

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
fn detect_interface_ip() -> Option<String> {
    None
}

/// 是否为可用的非回环 IPv4 地址
fn is_routable_ipv4(candidate: &str) -> bool {
    match Ipv4Addr::from_str(candidate) {
        Ok(addr) => !addr.is_loopback() && !addr.is_unspecified(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_routable_ipv4() {
        assert!(is_routable_ipv4("192.168.1.20"));
        assert!(is_routable_ipv4("10.0.0.3"));
        assert!(is_routable_ipv4("8.8.8.8"));
        assert!(!is_routable_ipv4("127.0.0.1"));
        assert!(!is_routable_ipv4("0.0.0.0"));
        assert!(!is_routable_ipv4("fe80::1"));
        assert!(!is_routable_ipv4("not-an-ip"));
    }

    #[test]
    fn test_detect_host_ip_never_empty() {
        let ip = detect_host_ip();
        assert!(!ip.is_empty());
        assert!(ip == "localhost" || is_routable_ipv4(&ip));
    }
}
