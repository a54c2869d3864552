//! 文件原语 - htpasswd 检查依赖的外部操作
//!
//! `FilePrimitives` 是注入点，`SystemPrimitives` 调用系统上的 `htpasswd` 工具，
//! 测试中可替换为内存实现。

use regex::bytes::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

/// grep 出错时的返回码（与 grep 工具一致）
pub const GREP_ERROR: i32 = 2;

/// 命令无法启动时的返回码
pub const SPAWN_FAILED: i32 = 127;

/// 外部操作的执行结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    pub retcode: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn new(retcode: i32, stderr: impl Into<String>) -> Self {
        Self {
            retcode,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.retcode == 0
    }

    /// 面向用户的描述：优先 stderr，其次 stdout，最后是返回码
    pub fn message(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        format!("retcode {}", self.retcode)
    }

    fn from_output(output: Output) -> Self {
        Self {
            retcode: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

/// htpasswd 检查依赖的外部操作
pub trait FilePrimitives: Send + Sync {
    /// 文件是否存在
    fn file_exists(&self, path: &Path) -> bool;

    /// 在文件中按正则查找：0 = 命中，1 = 未命中，其他 = 出错
    fn grep(&self, path: &Path, pattern: &str) -> CommandResult;

    /// 添加或覆盖用户
    fn useradd(&self, path: &Path, name: &str, password: &str, options: &str, runas: Option<&str>) -> CommandResult;

    /// 删除用户
    fn userdel(&self, path: &Path, name: &str, runas: Option<&str>) -> CommandResult;

    /// 校验密码：0 = 正确，`options` 与写入时一致（如哈希算法）
    fn verify(&self, path: &Path, name: &str, password: &str, options: &str, runas: Option<&str>) -> CommandResult;
}

/// 基于本地文件系统和 `htpasswd` 命令的实现
pub struct SystemPrimitives {
    htpasswd_cmd: PathBuf,
}

impl SystemPrimitives {
    pub fn new() -> Self {
        Self {
            htpasswd_cmd: Self::find_htpasswd_path(),
        }
    }

    /// 指定 htpasswd 命令路径
    pub fn with_command(cmd: impl Into<PathBuf>) -> Self {
        Self {
            htpasswd_cmd: cmd.into(),
        }
    }

    /// 查找 htpasswd 可执行文件，找不到时交给 PATH
    fn find_htpasswd_path() -> PathBuf {
        which::which("htpasswd").unwrap_or_else(|_| PathBuf::from("htpasswd"))
    }

    /// 构造命令，指定 runas 时通过 sudo 切换用户
    fn build(&self, runas: Option<&str>) -> Command {
        match runas {
            Some(user) => {
                let mut cmd = Command::new("sudo");
                cmd.arg("-u").arg(user).arg(&self.htpasswd_cmd);
                cmd
            }
            None => Command::new(&self.htpasswd_cmd),
        }
    }

    fn run(&self, mut cmd: Command, action: &str) -> CommandResult {
        match cmd.output() {
            Ok(output) => {
                let result = CommandResult::from_output(output);
                debug!(action, retcode = result.retcode, "htpasswd command finished");
                result
            }
            Err(e) => CommandResult::new(
                SPAWN_FAILED,
                format!("Failed to run {}: {}", self.htpasswd_cmd.display(), e),
            ),
        }
    }
}

impl Default for SystemPrimitives {
    fn default() -> Self {
        Self::new()
    }
}

/// `-bv` 加上额外选项，去掉会重建文件的 `c`
fn verify_flags(options: &str) -> String {
    let extra: String = options.trim().trim_start_matches('-').chars().filter(|c| *c != 'c').collect();
    format!("-bv{}", extra)
}

/// `-b` 加上额外选项，文件不存在时追加 `c`
fn useradd_flags(options: &str, create: bool) -> String {
    let mut flags = format!("-b{}", options.trim().trim_start_matches('-'));
    if create && !flags.contains('c') {
        flags.push('c');
    }
    flags
}

impl FilePrimitives for SystemPrimitives {
    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn grep(&self, path: &Path, pattern: &str) -> CommandResult {
        let re = match Regex::new(pattern) {
            Ok(re) => re,
            Err(e) => return CommandResult::new(GREP_ERROR, format!("grep: invalid pattern: {}", e)),
        };

        let content = match fs::read(path) {
            Ok(c) => c,
            Err(e) => return CommandResult::new(GREP_ERROR, format!("grep: {}: {}", path.display(), e)),
        };

        let matched: Vec<String> = content
            .split(|b| *b == b'\n')
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .filter(|line| re.is_match(line))
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect();
        if matched.is_empty() {
            CommandResult::new(1, "")
        } else {
            CommandResult {
                retcode: 0,
                stdout: matched.join("\n"),
                stderr: String::new(),
            }
        }
    }

    fn useradd(&self, path: &Path, name: &str, password: &str, options: &str, runas: Option<&str>) -> CommandResult {
        let mut cmd = self.build(runas);
        cmd.arg(useradd_flags(options, !path.exists()))
            .arg(path)
            .arg(name)
            .arg(password);
        self.run(cmd, "useradd")
    }

    fn userdel(&self, path: &Path, name: &str, runas: Option<&str>) -> CommandResult {
        if !path.exists() {
            return CommandResult::new(1, format!("htpasswd file {} does not exist", path.display()));
        }
        let mut cmd = self.build(runas);
        cmd.arg("-D").arg(path).arg(name);
        self.run(cmd, "userdel")
    }

    fn verify(&self, path: &Path, name: &str, password: &str, options: &str, runas: Option<&str>) -> CommandResult {
        let mut cmd = self.build(runas);
        cmd.arg(verify_flags(options)).arg(path).arg(name).arg(password);
        self.run(cmd, "verify")
    }
}
