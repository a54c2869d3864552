//! 作业结果记录 - returner 的输入
//!
//! 由宿主运行时在作业完成后提供，通常以 JSON 形式传入。

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fs;
use std::io::Read;
use std::path::Path;

use crate::config::OptionMap;

/// 作业结果记录
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobResult {
    /// Minion ID
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    /// 执行的函数名
    #[serde(default, deserialize_with = "lenient_string")]
    pub fun: String,
    /// 函数参数
    #[serde(default, deserialize_with = "lenient_args")]
    pub fun_args: Vec<Value>,
    /// Job ID
    #[serde(default, deserialize_with = "lenient_string")]
    pub jid: String,
    /// 函数返回值（任意嵌套结构）
    #[serde(rename = "return", default)]
    pub return_value: Value,
    /// 使用的备选配置名（如 "alternative"）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ret_config: Option<String>,
    /// 单次调用的配置覆盖
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub ret_kwargs: OptionMap,
}

/// 宿主传入的字段类型不固定：数字转为文本，null 视为空
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// null 视为无参数，单个值视为只有一个参数
fn lenient_args<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        other => vec![other],
    })
}

impl JobResult {
    pub fn new(id: impl Into<String>, fun: impl Into<String>, jid: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fun: fun.into(),
            jid: jid.into(),
            ..Default::default()
        }
    }

    /// 设置返回值
    pub fn with_return(mut self, value: Value) -> Self {
        self.return_value = value;
        self
    }

    /// 设置函数参数
    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.fun_args = args;
        self
    }

    /// 设置备选配置名
    pub fn with_ret_config(mut self, name: impl Into<String>) -> Self {
        self.ret_config = Some(name.into());
        self
    }

    /// 从 JSON 文件加载，`-` 表示 stdin
    pub fn load(path: &str) -> Result<Self> {
        let content = if path == "-" {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read job result from stdin")?;
            buf
        } else {
            fs::read_to_string(Path::new(path))
                .with_context(|| format!("Failed to read job result: {}", path))?
        };
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Invalid job result JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_full_record() {
        let job = JobResult::from_json(
            r#"{"id":"web01","fun":"test.ping","fun_args":[],"jid":"20260101","return":true,"success":true}"#,
        )
        .unwrap();
        assert_eq!(job.id, "web01");
        assert_eq!(job.fun, "test.ping");
        assert_eq!(job.return_value, json!(true));
        assert!(job.ret_config.is_none());
    }

    #[test]
    fn test_from_json_missing_fields_default() {
        let job = JobResult::from_json(r#"{"id":"web01"}"#).unwrap();
        assert_eq!(job.fun, "");
        assert!(job.fun_args.is_empty());
        assert!(job.return_value.is_null());
        assert!(job.ret_kwargs.is_empty());
    }

    #[test]
    fn test_from_json_null_args_and_numeric_jid() {
        let job = JobResult::from_json(
            r#"{"id":"web01","fun":"test.ping","fun_args":null,"jid":20260101120000,"return":true}"#,
        )
        .unwrap();
        assert!(job.fun_args.is_empty());
        assert_eq!(job.jid, "20260101120000");
    }

    #[test]
    fn test_from_json_null_and_scalar_fields() {
        let job = JobResult::from_json(r#"{"id":null,"fun":"cmd.run","fun_args":"uptime","jid":null}"#).unwrap();
        assert_eq!(job.id, "");
        assert_eq!(job.jid, "");
        assert_eq!(job.fun_args, vec![json!("uptime")]);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(JobResult::from_json("not json").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.json");
        fs::write(&path, r#"{"id":"db01","fun":"state.apply","ret_config":"alternative"}"#).unwrap();

        let job = JobResult::load(path.to_str().unwrap()).unwrap();
        assert_eq!(job.id, "db01");
        assert_eq!(job.ret_config.as_deref(), Some("alternative"));
    }
}
