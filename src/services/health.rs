//! 服务健康检查
//!
//! 对注册表中的每个服务做 TCP 连通性探测，按轮次重试直到全部可达或
//! 预算耗尽。一轮内的探测并发执行，轮与轮之间串行并有固定间隔。

use std::time::Duration;

use futures::future::join_all;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::services::ServiceDescriptor;
use crate::domain::install::{HealthCheckResult, HealthStatus};

/// 轮询策略
///
/// 默认 15 轮、轮间 2 秒、单次探测超时 2 秒，最坏等待约 30 秒。
/// 测试中可替换为零延迟策略
#[derive(Clone, Debug)]
pub struct PollPolicy {
    /// 最大轮数
    pub max_attempts: u32,
    /// 轮间延迟
    pub round_delay: Duration,
    /// 单次探测超时
    pub probe_timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 15,
            round_delay: Duration::from_secs(2),
            probe_timeout: Duration::from_secs(2),
        }
    }
}

/// 轮询结果
#[derive(Debug, PartialEq)]
pub enum PollOutcome {
    /// 某一轮全部可达
    Ready { attempts: u32 },
    /// 预算耗尽，附带最后一轮的各服务状态
    TimedOut { last_results: Vec<HealthCheckResult> },
    /// 轮与轮之间观察到取消请求
    Cancelled,
}

/// 探测单个服务
///
/// 连接被拒绝与超时对 readiness 的影响相同，区分仅供展示
pub async fn probe_service(
    service: &ServiceDescriptor,
    probe_timeout: Duration,
) -> HealthCheckResult {
    let status = match tokio::time::timeout(
        probe_timeout,
        TcpStream::connect((service.host.as_str(), service.port)),
    )
    .await
    {
        Ok(Ok(_)) => HealthStatus::Running,
        Ok(Err(_)) => HealthStatus::Error,
        Err(_) => HealthStatus::Timeout,
    };

    HealthCheckResult {
        service: service.clone(),
        status,
    }
}

/// 轮询直到全部服务就绪
///
/// 每轮并发探测所有服务；未全部就绪时调用 `on_waiting`（附当前轮数）
/// 并等待 `round_delay`。等待期间观察到取消立即返回 `Cancelled`，
/// 不会继续消耗剩余轮数
pub async fn poll_until_ready(
    services: &[ServiceDescriptor],
    policy: &PollPolicy,
    cancel: &CancellationToken,
    mut on_waiting: impl FnMut(u32),
) -> PollOutcome {
    for attempt in 1..=policy.max_attempts {
        if cancel.is_cancelled() {
            return PollOutcome::Cancelled;
        }

        let probes = services
            .iter()
            .map(|service| probe_service(service, policy.probe_timeout));
        let results: Vec<HealthCheckResult> = join_all(probes).await;

        let all_ready = results.iter().all(|r| r.status == HealthStatus::Running);
        debug!(attempt, all_ready, "Health check round finished");

        if all_ready {
            return PollOutcome::Ready { attempts: attempt };
        }

        if attempt == policy.max_attempts {
            return PollOutcome::TimedOut {
                last_results: results,
            };
        }

        on_waiting(attempt);
        tokio::select! {
            _ = cancel.cancelled() => return PollOutcome::Cancelled,
            _ = tokio::time::sleep(policy.round_delay) => {}
        }
    }

    // max_attempts 为 0 的退化情况
    PollOutcome::TimedOut {
        last_results: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn zero_delay_policy(max_attempts: u32) -> PollPolicy {
        PollPolicy {
            max_attempts,
            round_delay: Duration::ZERO,
            probe_timeout: Duration::from_millis(500),
        }
    }

    async fn listening_service(name: &str) -> (ServiceDescriptor, TcpListener) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (ServiceDescriptor::new(name, "127.0.0.1", port), listener)
    }

    fn closed_service(name: &str) -> ServiceDescriptor {
        // 绑定后立即释放，拿到一个大概率无人监听的端口
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        ServiceDescriptor::new(name, "127.0.0.1", port)
    }

    #[tokio::test]
    async fn test_probe_reachable_service() {
        let (service, _listener) = listening_service("svc").await;
        let result = probe_service(&service, Duration::from_secs(1)).await;
        assert_eq!(result.status, HealthStatus::Running);
    }

    #[tokio::test]
    async fn test_probe_refused_connection_is_error() {
        let service = closed_service("svc");
        let result = probe_service(&service, Duration::from_secs(1)).await;
        assert_eq!(result.status, HealthStatus::Error);
    }

    #[tokio::test]
    async fn test_all_ready_consumes_one_round() {
        let (a, _la) = listening_service("a").await;
        let (b, _lb) = listening_service("b").await;
        let cancel = CancellationToken::new();
        let mut waits = 0;

        let outcome = poll_until_ready(
            &[a, b],
            &zero_delay_policy(15),
            &cancel,
            |_| waits += 1,
        )
        .await;

        assert_eq!(outcome, PollOutcome::Ready { attempts: 1 });
        assert_eq!(waits, 0);
    }

    #[tokio::test]
    async fn test_unreachable_exhausts_exact_budget() {
        let service = closed_service("down");
        let cancel = CancellationToken::new();
        let mut waits = 0;

        let outcome = poll_until_ready(
            &[service.clone()],
            &zero_delay_policy(4),
            &cancel,
            |_| waits += 1,
        )
        .await;

        match outcome {
            PollOutcome::TimedOut { last_results } => {
                assert_eq!(last_results.len(), 1);
                assert_eq!(last_results[0].service, service);
                assert_ne!(last_results[0].status, HealthStatus::Running);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        // 最后一轮之后不再等待
        assert_eq!(waits, 3);
    }

    #[tokio::test]
    async fn test_cancel_before_first_round() {
        let (service, _listener) = listening_service("svc").await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome =
            poll_until_ready(&[service], &zero_delay_policy(15), &cancel, |_| {}).await;
        assert_eq!(outcome, PollOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_between_rounds_never_reports_timeout() {
        let service = closed_service("down");
        let cancel = CancellationToken::new();
        let cancel_in_callback = cancel.clone();

        // 第二轮结束后请求取消：第三轮不应再开始
        let mut rounds_waited = 0;
        let outcome = poll_until_ready(
            &[service],
            &zero_delay_policy(15),
            &cancel,
            |attempt| {
                rounds_waited += 1;
                if attempt == 2 {
                    cancel_in_callback.cancel();
                }
            },
        )
        .await;

        assert_eq!(outcome, PollOutcome::Cancelled);
        assert_eq!(rounds_waited, 2);
    }
}
