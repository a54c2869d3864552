//! Pushover returner - 将作业结果推送到 Pushover
//!
//! 流程：
//! 1. 解析选项，缺少 `user` 或 `token` 直接放弃
//! 2. `priority == 2` 时必须同时设置 `expire` 和 `retry`
//! 3. 用固定模板格式化消息
//! 4. 校验 user/group，无效则不发送
//! 5. 若配置了提示音则校验，无效的提示音静默丢弃
//! 6. 发送消息，`status == 0` 视为失败

use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use super::channel::Returner;
use super::pretty::{compact, pretty};
use super::pushover::{ApiResponse, PushoverClient, PushoverMessage, DEFAULT_API_VERSION, PUSHOVER_API_URL};
use super::transport::HttpTransport;
use crate::config::{fill_from_env, ConfigFile, OptionMap};
use crate::job::JobResult;

/// returner 名称，也是配置段名
pub const VIRTUAL_NAME: &str = "pushover";

/// 紧急优先级，需要 expire/retry
pub const EMERGENCY_PRIORITY: i64 = 2;

/// 内置默认值
pub fn default_options() -> OptionMap {
    let mut defaults = OptionMap::new();
    defaults.insert("priority".to_string(), Value::String("0".to_string()));
    defaults.insert("api_version".to_string(), Value::String(DEFAULT_API_VERSION.to_string()));
    defaults
}

/// returner 失败原因
#[derive(Debug, Error)]
pub enum ReturnerError {
    #[error("pushover.{0} not defined in config")]
    MissingOption(&'static str),
    #[error("Priority 2 requires pushover.expire and pushover.retry options")]
    PriorityRequiresExpireAndRetry,
    #[error("Pushover user or group is not valid: {0}")]
    InvalidUser(String),
    #[error("Pushover rejected the message: {0}")]
    Rejected(Value),
}

/// 解析后的 Pushover 选项
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PushoverOptions {
    pub user: Option<String>,
    pub token: Option<String>,
    pub device: Option<String>,
    pub title: Option<String>,
    pub priority: Option<String>,
    pub expire: Option<String>,
    pub retry: Option<String>,
    pub sound: Option<String>,
    pub api_version: Option<String>,
}

impl PushoverOptions {
    /// 从合并后的选项表提取
    pub fn from_bundle(bundle: &OptionMap) -> Self {
        let get = |key: &str| bundle.get(key).and_then(option_string);
        Self {
            user: get("user"),
            token: get("token"),
            device: get("device"),
            title: get("title"),
            priority: get("priority"),
            expire: get("expire"),
            retry: get("retry"),
            sound: get("sound"),
            api_version: get("api_version"),
        }
    }

    /// 从配置文件、job 覆盖和环境变量解析
    ///
    /// `alternative` 优先于 job 自带的 `ret_config`。
    pub fn resolve(config: &ConfigFile, job: &JobResult, alternative: Option<&str>) -> Self {
        Self::resolve_with(config, job, alternative, process_env)
    }

    /// 同 `resolve`，环境变量由 `env_lookup` 提供
    pub fn resolve_with(config: &ConfigFile, job: &JobResult, alternative: Option<&str>, env_lookup: EnvLookup) -> Self {
        let alternative = alternative.or(job.ret_config.as_deref());
        let mut bundle = config.returner_options(VIRTUAL_NAME, alternative, &job.ret_kwargs, &default_options());
        fill_from_env(&mut bundle, VIRTUAL_NAME, &["user", "token"], env_lookup);
        Self::from_bundle(&bundle)
    }

    /// 数值形式的优先级
    pub fn priority_level(&self) -> Option<i64> {
        self.priority.as_deref().and_then(|p| p.trim().parse().ok())
    }
}

/// 环境变量查找函数
pub type EnvLookup = fn(&str) -> Option<String>;

fn process_env(var: &str) -> Option<String> {
    std::env::var(var).ok()
}

/// 选项值转字符串，空串和非标量视为未设置
fn option_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// 用固定模板格式化作业结果
pub fn format_message(job: &JobResult) -> String {
    format!(
        "id: {}\r\nfunction: {}\r\nfunction args: {}\r\njid: {}\r\nreturn: {}\r\n",
        job.id,
        job.fun,
        compact(&Value::Array(job.fun_args.clone())),
        job.jid,
        pretty(&job.return_value),
    )
}

/// Pushover returner
pub struct PushoverReturner {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
}

impl PushoverReturner {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            base_url: PUSHOVER_API_URL.to_string(),
        }
    }

    /// 设置 API 基础 URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 发送作业结果，成功返回 true，所有失败都只记录日志
    pub fn send(&self, job: &JobResult, options: &PushoverOptions) -> bool {
        match self.try_send(job, options) {
            Ok(response) => {
                info!(jid = %job.jid, minion = %job.id, payload = %response.payload, "Pushover message sent");
                true
            }
            Err(e @ (ReturnerError::MissingOption(_) | ReturnerError::PriorityRequiresExpireAndRetry)) => {
                error!(jid = %job.jid, "{}", e);
                false
            }
            Err(e) => {
                info!(jid = %job.jid, "Error: {}", e);
                false
            }
        }
    }

    /// 发送作业结果，返回具体失败原因
    pub fn try_send(&self, job: &JobResult, options: &PushoverOptions) -> Result<ApiResponse, ReturnerError> {
        let user = options.user.as_deref().ok_or(ReturnerError::MissingOption("user"))?;
        let token = options.token.as_deref().ok_or(ReturnerError::MissingOption("token"))?;

        if options.priority_level() == Some(EMERGENCY_PRIORITY)
            && (options.expire.is_none() || options.retry.is_none())
        {
            return Err(ReturnerError::PriorityRequiresExpireAndRetry);
        }

        let client = PushoverClient::new(self.transport.clone())
            .with_base_url(self.base_url.clone())
            .with_api_version(options.api_version.as_deref().unwrap_or(DEFAULT_API_VERSION));

        if !client.validate_user(user, options.device.as_deref(), token) {
            return Err(ReturnerError::InvalidUser(user.to_string()));
        }

        let sound = options
            .sound
            .as_deref()
            .filter(|sound| client.validate_sound(sound, token))
            .map(str::to_string);

        let message = PushoverMessage {
            user: user.to_string(),
            message: format_message(job),
            device: options.device.clone(),
            title: options.title.clone(),
            priority: options.priority.clone(),
            expire: options.expire.clone(),
            retry: options.retry.clone(),
            sound,
        };

        let response = client.post_message(&message, token);
        if response.ok {
            Ok(response)
        } else {
            Err(ReturnerError::Rejected(response.payload))
        }
    }
}

/// 绑定配置文件的 Pushover returner
pub struct ConfiguredPushover {
    returner: PushoverReturner,
    config: ConfigFile,
    alternative: Option<String>,
    env_lookup: EnvLookup,
}

impl ConfiguredPushover {
    pub fn new(returner: PushoverReturner, config: ConfigFile) -> Self {
        Self {
            returner,
            config,
            alternative: None,
            env_lookup: process_env,
        }
    }

    /// 替换环境变量来源（默认读取进程环境）
    pub fn with_env_lookup(mut self, env_lookup: EnvLookup) -> Self {
        self.env_lookup = env_lookup;
        self
    }

    /// 强制使用某个备选配置
    pub fn with_alternative(mut self, alternative: Option<String>) -> Self {
        self.alternative = alternative;
        self
    }
}

impl Returner for ConfiguredPushover {
    fn name(&self) -> &str {
        VIRTUAL_NAME
    }

    fn deliver(&self, job: &JobResult) -> bool {
        let options = PushoverOptions::resolve_with(&self.config, job, self.alternative.as_deref(), self.env_lookup);
        self.returner.send(job, &options)
    }
}
