//! 配置解析 - returner 选项的合并与查找
//!
//! 优先级（高到低）：
//! 1. 单次调用覆盖（job 的 `ret_kwargs`）
//! 2. 备选配置段（如 `alternative.pushover`）
//! 3. 默认配置段（如 `pushover`）
//! 4. profile 引用的配置段
//! 5. 内置默认值
//!
//! 配置文件为 JSON，默认路径 `~/.config/returner-plugins/config.json`，
//! 可通过 `RTP_CONFIG` 环境变量覆盖。

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 选项名 → 值
pub type OptionMap = serde_json::Map<String, Value>;

/// profile 引用所用的键
pub const PROFILE_KEY: &str = "profile";

/// 合并配置：explicit 覆盖 profile，profile 覆盖 defaults
///
/// profile 名从 `explicit["profile"]` 读取，交给 `profile_lookup` 查找。
/// `null` 视为未设置，不会覆盖低优先级的值。
pub fn resolve_config<F>(explicit: &OptionMap, profile_lookup: F, defaults: &OptionMap) -> OptionMap
where
    F: FnOnce(&str) -> Option<OptionMap>,
{
    let mut bundle = OptionMap::new();
    overlay(&mut bundle, defaults);

    if let Some(profile) = explicit.get(PROFILE_KEY).and_then(Value::as_str) {
        match profile_lookup(profile) {
            Some(values) => overlay(&mut bundle, &values),
            None => debug!(profile = %profile, "Referenced profile not found"),
        }
    }

    overlay(&mut bundle, explicit);
    bundle
}

/// 将 `top` 中非 null 的值写入 `base`
pub fn overlay(base: &mut OptionMap, top: &OptionMap) {
    for (key, value) in top {
        if !value.is_null() {
            base.insert(key.clone(), value.clone());
        }
    }
}

/// 用环境变量补全缺失的选项，如 `PUSHOVER_USER` → `user`
pub fn fill_from_env<F>(bundle: &mut OptionMap, namespace: &str, keys: &[&str], lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for key in keys {
        if bundle.get(*key).map_or(false, |v| !v.is_null()) {
            continue;
        }
        let var = format!("{}_{}", namespace, key).to_uppercase();
        if let Some(value) = lookup(&var).filter(|v| !v.is_empty()) {
            debug!(option = %key, env = %var, "Using option from environment");
            bundle.insert(key.to_string(), Value::String(value));
        }
    }
}

/// JSON 配置文件
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    root: OptionMap,
}

impl ConfigFile {
    /// 默认配置文件路径
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var("RTP_CONFIG") {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("returner-plugins")
            .join("config.json")
    }

    /// 加载配置文件，文件不存在时返回空配置
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);

        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using empty config");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config JSON: {}", path.display()))?;

        debug!(path = %path.display(), "Loaded config file");
        Ok(Self::from_value(value))
    }

    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(root) => Self { root },
            _ => Self::default(),
        }
    }

    /// 获取顶层配置段
    pub fn section(&self, name: &str) -> Option<&OptionMap> {
        self.root.get(name).and_then(Value::as_object)
    }

    /// 组装某个 returner 的完整选项
    ///
    /// `namespace` 为 returner 名（如 `pushover`），`alternative` 为备选配置名，
    /// `overrides` 的键可带 `<namespace>.` 前缀。
    pub fn returner_options(
        &self,
        namespace: &str,
        alternative: Option<&str>,
        overrides: &OptionMap,
        defaults: &OptionMap,
    ) -> OptionMap {
        let mut explicit = OptionMap::new();

        if let Some(base) = self.section(namespace) {
            overlay(&mut explicit, base);
        }

        if let Some(alt) = alternative {
            let alt_name = format!("{}.{}", alt, namespace);
            match self.section(&alt_name) {
                Some(values) => overlay(&mut explicit, values),
                None => debug!(section = %alt_name, "Alternative config section not found"),
            }
        }

        let prefix = format!("{}.", namespace);
        let stripped: OptionMap = overrides
            .iter()
            .map(|(k, v)| (k.strip_prefix(&prefix).unwrap_or(k).to_string(), v.clone()))
            .collect();
        overlay(&mut explicit, &stripped);

        resolve_config(&explicit, |name| self.section(name).cloned(), defaults)
    }
}
