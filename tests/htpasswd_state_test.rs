//! htpasswd 状态检查集成测试 - 使用会记住写入的内存原语

use returner_plugins::htpasswd::{entry_pattern, CommandResult};
use returner_plugins::{
    EnsureOutcome, FilePrimitives, HtpasswdChecker, RemoveOutcome, SystemPrimitives, UserAbsentOptions,
    UserExistsOptions,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// 内存中的 htpasswd 文件集合
#[derive(Default)]
struct InMemoryFiles {
    files: Mutex<BTreeMap<PathBuf, Vec<(String, String)>>>,
}

impl FilePrimitives for InMemoryFiles {
    fn file_exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn grep(&self, path: &Path, pattern: &str) -> CommandResult {
        let files = self.files.lock().unwrap();
        let Some(entries) = files.get(path) else {
            return CommandResult::new(2, format!("grep: {}: No such file or directory", path.display()));
        };
        let re = regex::Regex::new(pattern).unwrap();
        let hit = entries.iter().any(|(user, hash)| re.is_match(&format!("{}:{}", user, hash)));
        CommandResult::new(if hit { 0 } else { 1 }, "")
    }

    fn useradd(&self, path: &Path, name: &str, password: &str, _options: &str, _runas: Option<&str>) -> CommandResult {
        let mut files = self.files.lock().unwrap();
        let entries = files.entry(path.to_path_buf()).or_default();
        entries.retain(|(user, _)| user != name);
        entries.push((name.to_string(), format!("hash-{}", password)));
        CommandResult::new(0, format!("Adding password for user {}", name))
    }

    fn userdel(&self, path: &Path, name: &str, _runas: Option<&str>) -> CommandResult {
        let mut files = self.files.lock().unwrap();
        match files.get_mut(path) {
            Some(entries) => {
                entries.retain(|(user, _)| user != name);
                CommandResult::new(0, format!("Deleting password for user {}", name))
            }
            None => CommandResult::new(1, "file not found"),
        }
    }

    fn verify(&self, path: &Path, name: &str, password: &str, _options: &str, _runas: Option<&str>) -> CommandResult {
        let files = self.files.lock().unwrap();
        let expected = format!("hash-{}", password);
        let ok = files
            .get(path)
            .map_or(false, |entries| entries.iter().any(|(u, h)| u == name && *h == expected));
        CommandResult::new(if ok { 0 } else { 3 }, "")
    }
}

fn htpasswd_path() -> PathBuf {
    PathBuf::from("/etc/httpd/htpasswd")
}

#[test]
fn test_second_call_is_already_exists() {
    let checker = HtpasswdChecker::new(Arc::new(InMemoryFiles::default()));
    let opts = UserExistsOptions::default();

    let first = checker.ensure_user("larry", "badpass", &htpasswd_path(), &opts);
    assert_eq!(first, EnsureOutcome::Created("Adding password for user larry".to_string()));

    let second = checker.ensure_user("larry", "badpass", &htpasswd_path(), &opts);
    assert_eq!(second, EnsureOutcome::AlreadyExists);
}

#[test]
fn test_update_rewrites_changed_password_once() {
    let checker = HtpasswdChecker::new(Arc::new(InMemoryFiles::default()));
    let opts = UserExistsOptions {
        update: true,
        ..Default::default()
    };

    checker.user_exists("larry", "old", &htpasswd_path(), &opts);

    let changed = checker.user_exists("larry", "new", &htpasswd_path(), &opts);
    assert_eq!(changed.result, Some(true));
    assert!(changed.changes.contains_key("larry"));

    let unchanged = checker.user_exists("larry", "new", &htpasswd_path(), &opts);
    assert_eq!(unchanged.comment, "User already known");
    assert!(unchanged.changes.is_empty());
}

#[test]
fn test_present_then_absent_round() {
    let checker = HtpasswdChecker::new(Arc::new(InMemoryFiles::default()));

    checker.user_exists("larry", "badpass", &htpasswd_path(), &UserExistsOptions::default());
    checker.user_exists("moe", "badpass", &htpasswd_path(), &UserExistsOptions::default());

    let removed = checker.remove_user("larry", &htpasswd_path(), &UserAbsentOptions::default());
    assert_eq!(removed, RemoveOutcome::Removed("Deleting password for user larry".to_string()));

    let again = checker.remove_user("larry", &htpasswd_path(), &UserAbsentOptions::default());
    assert_eq!(again, RemoveOutcome::AlreadyAbsent);

    // moe 不受影响
    let moe = checker.ensure_user("moe", "badpass", &htpasswd_path(), &UserExistsOptions::default());
    assert_eq!(moe, EnsureOutcome::AlreadyExists);
}

#[test]
fn test_similar_names_do_not_match() {
    let checker = HtpasswdChecker::new(Arc::new(InMemoryFiles::default()));
    checker.user_exists("larry2", "badpass", &htpasswd_path(), &UserExistsOptions::default());

    let outcome = checker.ensure_user("larry", "badpass", &htpasswd_path(), &UserExistsOptions::default());
    assert!(matches!(outcome, EnsureOutcome::Created(_)));
    assert_eq!(entry_pattern("larry"), "^larry:");
}

#[test]
fn test_system_primitives_detect_existing_entry() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join(".htpasswd");
    fs::write(&file, "larry:$apr1$xyz$abc\n").unwrap();

    // 已存在时不会调用 htpasswd 命令
    let checker = HtpasswdChecker::new(Arc::new(SystemPrimitives::with_command("/nonexistent/htpasswd")));
    let result = checker.user_exists("larry", "badpass", &file, &UserExistsOptions::default());
    assert_eq!(result.result, Some(true));
    assert_eq!(result.comment, "User already known");
}

#[test]
fn test_system_primitives_missing_tool_reports_failure() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join(".htpasswd");

    let checker = HtpasswdChecker::new(Arc::new(SystemPrimitives::with_command("/nonexistent/htpasswd")));
    let result = checker.user_exists("larry", "badpass", &file, &UserExistsOptions::default());
    assert_eq!(result.result, Some(false));
    assert!(result.comment.contains("/nonexistent/htpasswd"));
    assert!(result.changes.is_empty());
}
