//! Intranet Install Agent - 内网服务一键安装代理
//!
//! Usage:
//! - Normal mode: `intranet-install-agent`
//! - With custom port: `intranet-install-agent --port 9311`
//! - With custom compose file: `intranet-install-agent --compose-file ./stack/docker-compose.yml`

use std::path::PathBuf;

use intranet_install_agent::RuntimeConfig;

/// 解析命令行参数
fn parse_args() -> RuntimeConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = RuntimeConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" if i + 1 < args.len() => {
                config.port_override = args[i + 1].parse().ok();
                i += 2;
            }
            "--compose-file" if i + 1 < args.len() => {
                config.compose_file_override = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                i += 1;
            }
        }
    }

    config
}

fn print_help() {
    println!("Intranet Install Agent - 内网服务一键安装代理");
    println!();
    println!("USAGE:");
    println!("    intranet-install-agent [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --port <PORT>            Override the listening port");
    println!("    --compose-file <PATH>    Override the docker-compose file path");
    println!("    -h, --help               Print help information");
    println!();
    println!("EXAMPLES:");
    println!("    intranet-install-agent                  # Normal mode");
    println!("    intranet-install-agent --port 9311      # Custom port");
}

fn main() {
    let config = parse_args();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    rt.block_on(async {
        intranet_install_agent::init_and_run_agent_with_config(config).await;
    });
}
