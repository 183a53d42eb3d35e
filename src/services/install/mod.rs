//! Install orchestration
//!
//! Sequences a single install session: preflight checks, compose launch,
//! health polling, config generation. Every internal failure is wrapped
//! into exactly one terminal `InstallOutcome` before it crosses this
//! boundary; nothing else leaks to the API layer.

pub mod context;
pub mod supervisor;

use chrono::Utc;
use tracing::debug;

use crate::domain::install::{InstallFailure, InstallOutcome, InstallPhase};
use crate::infra::network;
use crate::services::health::{self, PollOutcome};
use crate::services::{config_writer, preflight, secret};

pub use context::InstallContext;
use supervisor::{ComposeSupervisor, WaitOutcome};

/// 执行安装会话
///
/// 这是安装的主入口点，结束时负责落终态并释放会话槽
pub async fn execute(ctx: InstallContext) {
    let outcome = run_install(&ctx).await;
    ctx.finish(outcome).await;
}

/// The state machine proper: Preflighting → Launching → AwaitingHealth →
/// WritingConfig, with failure and cancellation exits at every stage.
async fn run_install(ctx: &InstallContext) -> InstallOutcome {
    let config = &ctx.state.config;

    // Preflight: nothing with side effects happens before these pass
    ctx.set_phase(InstallPhase::Preflighting).await;
    ctx.log_status("Checking Docker installation...");
    if !preflight::check_docker(&config.docker_bin).await {
        return InstallOutcome::Failed {
            failure: InstallFailure::Preflight {
                message: "Docker is not installed or cannot be invoked".to_string(),
            },
        };
    }
    if !preflight::check_compose(&config.docker_bin, &config.compose_bin).await {
        return InstallOutcome::Failed {
            failure: InstallFailure::Preflight {
                message: "Docker Compose is not available (neither the plugin nor the legacy binary)"
                    .to_string(),
            },
        };
    }
    if ctx.is_cancelled() {
        return InstallOutcome::Cancelled;
    }

    // One secret per session, shared between the container environment and
    // the generated config files
    let session_secret = secret::generate_secret();
    debug!(
        session_id = %ctx.session_id,
        secret = %secret::redact(&session_secret),
        "Session secret provisioned"
    );

    ctx.set_phase(InstallPhase::Launching).await;
    ctx.log_status(format!(
        "Starting compose stack from {}",
        config.compose_file.display()
    ));
    let mut compose = match ComposeSupervisor::launch(
        &ctx.state.compose,
        &config.compose_file,
        &session_secret,
    ) {
        Ok(supervisor) => supervisor,
        Err(e) => {
            return InstallOutcome::Failed {
                failure: InstallFailure::Spawn {
                    error: e.to_string(),
                },
            }
        }
    };
    compose.forward_output(ctx.state.clone());

    match compose.wait(&ctx.cancel_token).await {
        WaitOutcome::Cancelled => return InstallOutcome::Cancelled,
        WaitOutcome::Exited(0) => {}
        WaitOutcome::Exited(code) => {
            return InstallOutcome::Failed {
                failure: InstallFailure::ProcessExit { exit_code: code },
            }
        }
    }

    ctx.set_phase(InstallPhase::AwaitingHealth).await;
    ctx.log_status(">>> Containers created. Verifying services...");
    let policy = config.poll_policy();
    let poll_outcome = health::poll_until_ready(
        &config.services,
        &policy,
        &ctx.cancel_token,
        |attempt| {
            ctx.log_status(format!(
                "Waiting for services ({}/{})...",
                attempt, policy.max_attempts
            ));
        },
    )
    .await;

    match poll_outcome {
        // compose up -d 已经退出，此处没有活动进程需要终止
        PollOutcome::Cancelled => return InstallOutcome::Cancelled,
        PollOutcome::TimedOut { last_results } => {
            return InstallOutcome::Failed {
                failure: InstallFailure::HealthTimeout { last_results },
            }
        }
        PollOutcome::Ready { attempts } => {
            ctx.log_status(format!("All services reachable (round {})", attempts));
        }
    }

    // 写配置前的最后一个挂起点
    if ctx.is_cancelled() {
        return InstallOutcome::Cancelled;
    }

    ctx.set_phase(InstallPhase::WritingConfig).await;
    let host_ip = network::detect_host_ip();
    ctx.log_status(format!("Generating configuration for {}", host_ip));

    match config_writer::write_session_config(
        &ctx.install_path,
        &config.compose_dir(),
        &session_secret,
        &host_ip,
        Utc::now(),
    )
    .await
    {
        Ok(()) => {
            ctx.log_status("[!] Intranet configuration generated.");
            InstallOutcome::Succeeded
        }
        Err(e) => InstallOutcome::Failed {
            failure: InstallFailure::ConfigWrite {
                path: e.path.display().to_string(),
                error: e.source.to_string(),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::services::ServiceDescriptor;
    use crate::config::EnvConfig;
    use crate::infra::ComposeInvocation;
    use crate::state::AppState;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpListener;

    struct Scenario {
        state: Arc<AppState>,
        ctx: InstallContext,
        install_dir: tempfile::TempDir,
        compose_dir: tempfile::TempDir,
    }

    /// sh 脚本伪装成 compose：追加的 `-f ... up -d` 成为脚本的位置参数
    fn fake_compose(script: &str) -> ComposeInvocation {
        ComposeInvocation {
            program: "sh".to_string(),
            base_args: vec!["-c".to_string(), script.to_string(), "--".to_string()],
        }
    }

    /// 搭一个完整场景：伪 compose 命令 + 指定的健康检查目标
    async fn scenario_with(
        compose: ComposeInvocation,
        services: Vec<ServiceDescriptor>,
        tweak: impl FnOnce(&mut EnvConfig),
    ) -> Scenario {
        let install_dir = tempfile::tempdir().unwrap();
        let compose_dir = tempfile::tempdir().unwrap();

        let mut config = EnvConfig {
            api_key: "test-key".to_string(),
            port: 0,
            compose_file: compose_dir.path().join("docker-compose.yml"),
            // 预检查探测用总能成功的命令代替 docker
            docker_bin: "true".to_string(),
            compose_bin: "true".to_string(),
            services,
            health_max_attempts: 3,
            health_round_delay_ms: 0,
            health_probe_timeout_ms: 500,
        };
        tweak(&mut config);

        let mut state = AppState::new(config);
        state.compose = compose;
        let state = Arc::new(state);

        let cancel_token = state.register_install("session-test").await.unwrap();
        let ctx = InstallContext::new(
            "session-test".to_string(),
            install_dir.path().to_path_buf(),
            state.clone(),
            cancel_token,
        );

        Scenario {
            state,
            ctx,
            install_dir,
            compose_dir,
        }
    }

    async fn scenario(compose_script: &str, services: Vec<ServiceDescriptor>) -> Scenario {
        scenario_with(fake_compose(compose_script), services, |_| {}).await
    }

    async fn reachable_service() -> (ServiceDescriptor, TcpListener) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (ServiceDescriptor::new("svc", "127.0.0.1", port), listener)
    }

    fn unreachable_service() -> ServiceDescriptor {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        ServiceDescriptor::new("down", "127.0.0.1", port)
    }

    #[tokio::test]
    async fn test_scenario_success_end_to_end() {
        let (svc, _listener) = reachable_service().await;
        let s = scenario("exit 0", vec![svc]).await;

        execute(s.ctx).await;

        let report = s.state.last_report.read().await;
        let report = report.as_ref().unwrap();
        assert_eq!(report.outcome, InstallOutcome::Succeeded);
        assert!(!s.state.has_running_install().await);

        // 两个产物都已生成，且密钥一致
        let install_env =
            std::fs::read_to_string(s.install_dir.path().join(".env")).unwrap();
        let compose_env =
            std::fs::read_to_string(s.compose_dir.path().join(".env")).unwrap();
        let secret = compose_env.strip_prefix("MONGO_PASS=").unwrap();
        assert_eq!(secret.len(), secret::SECRET_LEN);
        assert!(install_env.contains(&format!("REACT_APP_MINIO_SECRET_KEY={}", secret)));
        assert!(install_env.contains(&format!("mongodb://admin:{}@", secret)));
    }

    #[tokio::test]
    async fn test_scenario_health_timeout_writes_nothing() {
        let s = scenario("exit 0", vec![unreachable_service()]).await;

        execute(s.ctx).await;

        let report = s.state.last_report.read().await;
        match &report.as_ref().unwrap().outcome {
            InstallOutcome::Failed {
                failure: InstallFailure::HealthTimeout { last_results },
            } => {
                assert_eq!(last_results.len(), 1);
            }
            other => panic!("expected health timeout, got {:?}", other),
        }

        assert!(!s.install_dir.path().join(".env").exists());
        assert!(!s.compose_dir.path().join(".env").exists());
    }

    #[tokio::test]
    async fn test_scenario_spawn_failure_skips_health_polling() {
        let (svc, _listener) = reachable_service().await;
        // launch 必然失败的调用形式
        let missing = ComposeInvocation {
            program: "definitely-not-a-real-binary-x".to_string(),
            base_args: Vec::new(),
        };
        let s = scenario_with(missing, vec![svc], |_| {}).await;

        execute(s.ctx.clone()).await;

        let report = s.state.last_report.read().await;
        match &report.as_ref().unwrap().outcome {
            InstallOutcome::Failed {
                failure: InstallFailure::Spawn { .. },
            } => {}
            other => panic!("expected spawn failure, got {:?}", other),
        }

        // 未进入健康检查阶段
        let lines = s.state.status_log.snapshot();
        assert!(lines.iter().all(|l| !l.content.contains("Waiting for services")));
        assert!(!s.install_dir.path().join(".env").exists());
    }

    #[tokio::test]
    async fn test_scenario_nonzero_exit_is_process_failure() {
        let (svc, _listener) = reachable_service().await;
        let s = scenario("exit 3", vec![svc]).await;

        execute(s.ctx).await;

        let report = s.state.last_report.read().await;
        match &report.as_ref().unwrap().outcome {
            InstallOutcome::Failed {
                failure: InstallFailure::ProcessExit { exit_code },
            } => assert_eq!(*exit_code, 3),
            other => panic!("expected process exit failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_scenario_cancel_during_health_check() {
        // 留足轮数，让取消先于预算耗尽发生
        let s = scenario_with(fake_compose("exit 0"), vec![unreachable_service()], |c| {
            c.health_max_attempts = 100;
            c.health_round_delay_ms = 50;
        })
        .await;

        let handle = tokio::spawn(execute(s.ctx.clone()));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(s.state.cancel_install().await);
        handle.await.unwrap();

        let report = s.state.last_report.read().await;
        assert_eq!(report.as_ref().unwrap().outcome, InstallOutcome::Cancelled);
        assert!(!s.install_dir.path().join(".env").exists());
        assert!(!s.compose_dir.path().join(".env").exists());
        assert!(!s.state.has_running_install().await);
    }
}
