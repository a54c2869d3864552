//! Returner Plugins CLI
//!
//! 推送作业结果到 Pushover，检查 htpasswd 凭据文件

use anyhow::Result;
use clap::{Parser, Subcommand};
use returner_plugins::cli::{handle_htpasswd, handle_return, HtpasswdArgs, ReturnArgs};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "rtp")]
#[command(about = "Returner Plugins - 作业结果推送与 htpasswd 凭据检查")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 将作业结果推送到 Pushover
    Return(ReturnArgs),
    /// 确保 htpasswd 文件中用户存在或不存在
    Htpasswd(HtpasswdArgs),
}

fn main() -> Result<()> {
    // 通过 RUST_LOG 环境变量控制日志级别，默认为 info
    // 例如: RUST_LOG=debug rtp return --job job.json
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("returner_plugins=info,rtp=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    let ok = match cli.command {
        Commands::Return(args) => handle_return(args)?,
        Commands::Htpasswd(args) => handle_htpasswd(args)?,
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
