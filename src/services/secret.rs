//! 会话密钥生成
//!
//! 每个安装会话生成一次，作为生成的配置文件与容器环境之间共享的凭证。
//! 完整值不进日志。

use uuid::Uuid;

/// 密钥的十六进制长度
pub const SECRET_LEN: usize = 32;

/// 生成会话密钥
///
/// 来自操作系统的加密随机源，固定长度十六进制编码，与任何用户输入无关
pub fn generate_secret() -> String {
    Uuid::new_v4().simple().to_string()
}

/// 日志用的脱敏形式（只保留前四位）
pub fn redact(secret: &str) -> String {
    let head: String = secret.chars().take(4).collect();
    format!("{}…", head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_is_fixed_length_hex() {
        let secret = generate_secret();
        assert_eq!(secret.len(), SECRET_LEN);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_secrets_are_distinct_across_sessions() {
        let a = generate_secret();
        let b = generate_secret();
        assert_ne!(a, b);
    }

    #[test]
    fn test_redact_hides_tail() {
        let secret = "deadbeefdeadbeefdeadbeefdeadbeef";
        let redacted = redact(secret);
        assert!(redacted.starts_with("dead"));
        assert!(!redacted.contains("beefdead"));
    }
}
