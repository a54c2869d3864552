// src/cli/returner.rs
//! Return 命令 - 将作业结果推送到 Pushover

use crate::config::ConfigFile;
use crate::job::JobResult;
use crate::notification::pushover::PUSHOVER_API_URL;
use crate::notification::transport::DEFAULT_TIMEOUT_SECS;
use crate::notification::{ConfiguredPushover, PushoverReturner, ReqwestTransport, Returner};
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Return 命令参数
#[derive(Args)]
pub struct ReturnArgs {
    /// 作业结果 JSON 文件，`-` 表示 stdin
    #[arg(long, short, default_value = "-")]
    pub job: String,

    /// 配置文件路径（默认 ~/.config/returner-plugins/config.json）
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// 使用备选配置（如 alternative → alternative.pushover）
    #[arg(long)]
    pub return_config: Option<String>,

    /// Pushover API 基础 URL
    #[arg(long, default_value = PUSHOVER_API_URL)]
    pub api_url: String,

    /// 请求超时（秒）
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,
}

/// 处理 return 命令，返回是否发送成功
pub fn handle_return(args: ReturnArgs) -> Result<bool> {
    let (returner, job) = build_returner(args)?;
    Ok(run_return(&returner, &job))
}

/// 加载配置与作业结果，构造 returner
fn build_returner(args: ReturnArgs) -> Result<(ConfiguredPushover, JobResult)> {
    let config = ConfigFile::load(args.config.as_deref())?;
    let job = JobResult::load(&args.job)?;
    debug!(jid = %job.jid, fun = %job.fun, "Loaded job result");

    let transport = Arc::new(ReqwestTransport::new(Duration::from_secs(args.timeout))?);
    let returner = ConfiguredPushover::new(
        PushoverReturner::new(transport).with_base_url(args.api_url),
        config,
    )
    .with_alternative(args.return_config);
    Ok((returner, job))
}

fn run_return(returner: &dyn Returner, job: &JobResult) -> bool {
    let sent = returner.deliver(job);
    if sent {
        println!("{}: sent job {}", returner.name(), job.jid);
    } else {
        eprintln!("{}: job {} was not sent", returner.name(), job.jid);
    }
    sent
}
