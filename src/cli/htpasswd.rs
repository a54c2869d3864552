// src/cli/htpasswd.rs
//! Htpasswd 命令 - 确保用户在凭据文件中存在或不存在

use crate::htpasswd::{HtpasswdChecker, StateResult, SystemPrimitives, UserAbsentOptions, UserExistsOptions};
use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use super::output::format_state;

/// Htpasswd 命令参数
#[derive(Args)]
pub struct HtpasswdArgs {
    #[command(subcommand)]
    pub action: HtpasswdAction,

    /// htpasswd 可执行文件路径（默认从 PATH 查找）
    #[arg(long, global = true)]
    pub htpasswd_cmd: Option<PathBuf>,

    /// 输出 JSON 格式
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum HtpasswdAction {
    /// 确保用户存在
    Present {
        /// 用户名
        #[arg(long)]
        name: String,
        /// 密码
        #[arg(long)]
        password: String,
        /// htpasswd 文件路径
        #[arg(long)]
        file: PathBuf,
        /// 追加给 htpasswd 的选项（如 B 使用 bcrypt）
        #[arg(long, default_value = "")]
        options: String,
        /// 无论是否存在都重新写入
        #[arg(long)]
        force: bool,
        /// 密码不一致时更新
        #[arg(long)]
        update: bool,
        /// 以指定用户身份执行
        #[arg(long)]
        runas: Option<String>,
        /// 只报告，不修改
        #[arg(long)]
        test: bool,
    },
    /// 确保用户不存在
    Absent {
        /// 用户名
        #[arg(long)]
        name: String,
        /// htpasswd 文件路径
        #[arg(long)]
        file: PathBuf,
        /// 以指定用户身份执行
        #[arg(long)]
        runas: Option<String>,
        /// 只报告，不修改
        #[arg(long)]
        test: bool,
    },
}

/// 处理 htpasswd 命令，返回检查是否成功（test 模式视为成功）
pub fn handle_htpasswd(args: HtpasswdArgs) -> Result<bool> {
    let primitives = match args.htpasswd_cmd {
        Some(cmd) => SystemPrimitives::with_command(cmd),
        None => SystemPrimitives::new(),
    };
    let checker = HtpasswdChecker::new(Arc::new(primitives));

    let result = run_action(&checker, args.action);
    println!("{}", format_state(&result, args.json));
    Ok(result.result != Some(false))
}

fn run_action(checker: &HtpasswdChecker, action: HtpasswdAction) -> StateResult {
    match action {
        HtpasswdAction::Present {
            name,
            password,
            file,
            options,
            force,
            update,
            runas,
            test,
        } => {
            let opts = UserExistsOptions {
                options,
                force,
                update,
                runas,
                test,
            };
            checker.user_exists(&name, &password, &file, &opts)
        }
        HtpasswdAction::Absent { name, file, runas, test } => {
            checker.user_absent(&name, &file, &UserAbsentOptions { runas, test })
        }
    }
}
