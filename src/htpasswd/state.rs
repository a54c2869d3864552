//! htpasswd 状态检查 - 确保用户存在或不存在
//!
//! 只判断和分派，实际的文件修改全部交给 `FilePrimitives`。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use super::primitives::FilePrimitives;

/// 用户已存在时的说明
pub const ALREADY_KNOWN: &str = "User already known";

/// 用户已不在文件中时的说明
pub const ALREADY_ABSENT: &str = "User already not in file";

/// 状态检查结果
///
/// `result` 为 `None` 表示 test 模式，只报告将要做的变更。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateResult {
    pub name: String,
    pub result: Option<bool>,
    pub comment: String,
    pub changes: serde_json::Map<String, Value>,
}

impl StateResult {
    fn new(name: &str, result: Option<bool>, comment: impl Into<String>, changed: bool) -> Self {
        let mut changes = serde_json::Map::new();
        if changed {
            changes.insert(name.to_string(), Value::Bool(true));
        }
        Self {
            name: name.to_string(),
            result,
            comment: comment.into(),
            changes,
        }
    }
}

/// `user_exists` 的可选参数
#[derive(Debug, Clone, Default)]
pub struct UserExistsOptions {
    /// 追加给 htpasswd 的选项（如 `B` 使用 bcrypt）
    pub options: String,
    /// 无论是否存在都重新写入
    pub force: bool,
    /// 已存在时校验密码，不一致则更新
    pub update: bool,
    /// 以指定用户身份执行
    pub runas: Option<String>,
    /// 只报告，不修改
    pub test: bool,
}

/// `user_absent` 的可选参数
#[derive(Debug, Clone, Default)]
pub struct UserAbsentOptions {
    pub runas: Option<String>,
    pub test: bool,
}

/// `user_exists` 的结局
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// 用户已存在，无需变更
    AlreadyExists,
    /// 已添加，携带命令输出
    Created(String),
    /// 添加失败（或检查出错），携带错误输出
    Failed(String),
    /// test 模式：需要添加但未执行
    AbsentNoop,
}

impl EnsureOutcome {
    pub fn into_result(self, name: &str) -> StateResult {
        match self {
            EnsureOutcome::AlreadyExists => StateResult::new(name, Some(true), ALREADY_KNOWN, false),
            EnsureOutcome::Created(comment) => StateResult::new(name, Some(true), comment, true),
            EnsureOutcome::Failed(comment) => StateResult::new(name, Some(false), comment, false),
            EnsureOutcome::AbsentNoop => StateResult::new(
                name,
                None,
                format!("User '{}' is set to be added to htpasswd file", name),
                true,
            ),
        }
    }
}

/// `user_absent` 的结局
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// 用户本来就不在文件中
    AlreadyAbsent,
    /// 已删除，携带命令输出
    Removed(String),
    /// 删除失败，携带错误输出
    Failed(String),
    /// test 模式：需要删除但未执行
    PresentNoop,
}

impl RemoveOutcome {
    pub fn into_result(self, name: &str) -> StateResult {
        match self {
            RemoveOutcome::AlreadyAbsent => StateResult::new(name, Some(true), ALREADY_ABSENT, false),
            RemoveOutcome::Removed(comment) => StateResult::new(name, Some(true), comment, true),
            RemoveOutcome::Failed(comment) => StateResult::new(name, Some(false), comment, false),
            RemoveOutcome::PresentNoop => StateResult::new(
                name,
                None,
                format!("User '{}' is set to be removed from htpasswd file", name),
                true,
            ),
        }
    }
}

/// 匹配某个用户条目的正则
pub fn entry_pattern(name: &str) -> String {
    format!("^{}:", regex::escape(name))
}

/// htpasswd 状态检查器
pub struct HtpasswdChecker {
    primitives: Arc<dyn FilePrimitives>,
}

impl HtpasswdChecker {
    pub fn new(primitives: Arc<dyn FilePrimitives>) -> Self {
        Self { primitives }
    }

    /// 查找用户条目
    ///
    /// grep 命中即存在；文件不存在时 grep 出错也视为不存在，
    /// 文件存在而 grep 出错则返回错误输出。
    fn lookup(&self, name: &str, file: &Path) -> Result<bool, String> {
        let file_present = self.primitives.file_exists(file);
        let grep = self.primitives.grep(file, &entry_pattern(name));

        match grep.retcode {
            0 => Ok(true),
            1 => Ok(false),
            _ if !file_present => Ok(false),
            code => {
                warn!(file = %file.display(), retcode = code, "grep on htpasswd file failed");
                Err(grep.message())
            }
        }
    }

    /// 确保用户存在，返回结局
    pub fn ensure_user(&self, name: &str, password: &str, file: &Path, opts: &UserExistsOptions) -> EnsureOutcome {
        let exists = match self.lookup(name, file) {
            Ok(exists) => exists,
            Err(comment) => return EnsureOutcome::Failed(comment),
        };

        let password_changed = exists
            && opts.update
            && !opts.force
            && !self
                .primitives
                .verify(file, name, password, &opts.options, opts.runas.as_deref())
                .success();

        if exists && !password_changed && !opts.force {
            return EnsureOutcome::AlreadyExists;
        }

        if opts.test {
            return EnsureOutcome::AbsentNoop;
        }

        let added = self
            .primitives
            .useradd(file, name, password, &opts.options, opts.runas.as_deref());

        if added.success() {
            info!(user = %name, file = %file.display(), "Added user to htpasswd file");
            EnsureOutcome::Created(added.message())
        } else {
            warn!(user = %name, file = %file.display(), retcode = added.retcode, "Failed to add user to htpasswd file");
            EnsureOutcome::Failed(added.message())
        }
    }

    /// 确保用户存在
    pub fn user_exists(&self, name: &str, password: &str, file: &Path, opts: &UserExistsOptions) -> StateResult {
        self.ensure_user(name, password, file, opts).into_result(name)
    }

    /// 确保用户不存在，返回结局
    pub fn remove_user(&self, name: &str, file: &Path, opts: &UserAbsentOptions) -> RemoveOutcome {
        let exists = match self.lookup(name, file) {
            Ok(exists) => exists,
            Err(comment) => return RemoveOutcome::Failed(comment),
        };

        if !exists {
            return RemoveOutcome::AlreadyAbsent;
        }

        if opts.test {
            return RemoveOutcome::PresentNoop;
        }

        let removed = self.primitives.userdel(file, name, opts.runas.as_deref());
        if removed.success() {
            info!(user = %name, file = %file.display(), "Removed user from htpasswd file");
            RemoveOutcome::Removed(removed.message())
        } else {
            warn!(user = %name, file = %file.display(), retcode = removed.retcode, "Failed to remove user from htpasswd file");
            RemoveOutcome::Failed(removed.message())
        }
    }

    /// 确保用户不存在
    ///
    /// test 模式下即使无需变更，`result` 也为 `None`。
    pub fn user_absent(&self, name: &str, file: &Path, opts: &UserAbsentOptions) -> StateResult {
        let mut result = self.remove_user(name, file, opts).into_result(name);
        if opts.test && result.result == Some(true) {
            result.result = None;
        }
        result
    }
}
