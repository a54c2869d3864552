//! Pushover API 客户端
//!
//! 封装三个接口：
//! - `users/validate.json`：校验 user/group key
//! - `sounds.json`：列出可用提示音
//! - `messages.json`：发送消息

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::transport::{HttpMethod, HttpRequest, HttpTransport};

/// Pushover API 基础 URL
pub const PUSHOVER_API_URL: &str = "https://api.pushover.net";

/// 默认 API 版本
pub const DEFAULT_API_VERSION: &str = "1";

/// 缺少 token 时的提示
pub const MISSING_TOKEN_MESSAGE: &str = "No PushOver token found.";

/// Pushover API 功能
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFunction {
    Message,
    ValidateUser,
    ValidateSound,
}

impl ApiFunction {
    /// 请求路径（相对于版本前缀）
    pub fn path(&self) -> &'static str {
        match self {
            ApiFunction::Message => "messages.json",
            ApiFunction::ValidateUser => "users/validate.json",
            ApiFunction::ValidateSound => "sounds.json",
        }
    }
}

/// API 调用结果
///
/// `ok` 为 false 的情况：连接失败、响应无法解析、或 `status == 0`。
/// `payload` 为解析后的 JSON，失败时为错误信息或原始 body。
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub ok: bool,
    pub payload: Value,
}

impl ApiResponse {
    pub fn failure(payload: impl Into<Value>) -> Self {
        Self {
            ok: false,
            payload: payload.into(),
        }
    }

    /// 响应中的 `status` 字段
    pub fn status(&self) -> Option<i64> {
        self.payload.get("status").and_then(Value::as_i64)
    }

    /// 拼接响应中的 `errors` 列表
    pub fn errors(&self) -> String {
        self.payload
            .get("errors")
            .and_then(Value::as_array)
            .map(|errors| {
                errors
                    .iter()
                    .map(|e| e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string()))
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }

    /// 从 HTTP 状态码和 body 构造结果
    fn from_http(status: u16, body: String) -> Self {
        match serde_json::from_str::<Value>(&body) {
            Ok(payload) => {
                let rejected = payload.get("status").and_then(Value::as_i64) == Some(0);
                Self {
                    ok: !rejected,
                    payload,
                }
            }
            Err(e) => {
                warn!(status, error = %e, "Unparseable Pushover response");
                Self::failure(body)
            }
        }
    }
}

/// 待发送的消息
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PushoverMessage {
    pub user: String,
    pub message: String,
    pub device: Option<String>,
    pub title: Option<String>,
    pub priority: Option<String>,
    pub expire: Option<String>,
    pub retry: Option<String>,
    pub sound: Option<String>,
}

impl PushoverMessage {
    /// 转为表单字段，未设置的可选字段不出现
    pub fn form(&self, token: &str) -> Vec<(String, String)> {
        let mut form = vec![
            ("user".to_string(), self.user.clone()),
            ("token".to_string(), token.to_string()),
        ];
        let optional = [
            ("device", &self.device),
            ("title", &self.title),
            ("priority", &self.priority),
            ("expire", &self.expire),
            ("retry", &self.retry),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                form.push((key.to_string(), v.clone()));
            }
        }
        form.push(("message".to_string(), self.message.clone()));
        if let Some(sound) = &self.sound {
            form.push(("sound".to_string(), sound.clone()));
        }
        form
    }
}

/// Pushover API 客户端
pub struct PushoverClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    api_version: String,
}

impl PushoverClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            base_url: PUSHOVER_API_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    /// 设置 API 基础 URL（支持代理或测试服务器）
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 设置 API 版本
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// 拼接完整 URL
    pub fn url(&self, function: ApiFunction) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.api_version.trim_matches('/'),
            function.path()
        )
    }

    /// 执行一次 API 调用，所有失败都转为 `ok = false`
    pub fn query(
        &self,
        function: ApiFunction,
        method: HttpMethod,
        token: &str,
        form: Vec<(String, String)>,
        query: Vec<(String, String)>,
    ) -> ApiResponse {
        if token.is_empty() {
            warn!("{}", MISSING_TOKEN_MESSAGE);
            return ApiResponse::failure(MISSING_TOKEN_MESSAGE);
        }

        let request = HttpRequest {
            method,
            url: self.url(function),
            query,
            form,
        };

        match self.transport.execute(&request) {
            Ok(response) => {
                debug!(function = ?function, status = response.status, "Pushover API responded");
                ApiResponse::from_http(response.status, response.body)
            }
            Err(e) => {
                warn!(function = ?function, error = %e, "Pushover request failed");
                ApiResponse::failure(e.to_string())
            }
        }
    }

    /// 校验 user 或 group key 是否存在
    pub fn validate_user(&self, user: &str, device: Option<&str>, token: &str) -> bool {
        let mut form = vec![
            ("user".to_string(), user.to_string()),
            ("token".to_string(), token.to_string()),
        ];
        if let Some(device) = device {
            form.push(("device".to_string(), device.to_string()));
        }

        let response = self.query(ApiFunction::ValidateUser, HttpMethod::Post, token, form, Vec::new());
        if !response.ok {
            return false;
        }

        match response.status() {
            Some(1) => true,
            Some(_) => {
                info!(errors = %response.errors(), "Pushover user validation failed");
                false
            }
            None => false,
        }
    }

    /// 校验提示音是否在可用列表中
    pub fn validate_sound(&self, sound: &str, token: &str) -> bool {
        let query = vec![("token".to_string(), token.to_string())];
        let response = self.query(ApiFunction::ValidateSound, HttpMethod::Get, token, Vec::new(), query);
        if !response.ok {
            return false;
        }

        match response.status() {
            Some(1) => {
                let known = match response.payload.get("sounds") {
                    Some(Value::Object(sounds)) => sounds.contains_key(sound),
                    Some(Value::Array(sounds)) => sounds.iter().any(|s| s.as_str() == Some(sound)),
                    _ => false,
                };
                if !known {
                    info!(sound = %sound, "Not a valid Pushover sound");
                }
                known
            }
            Some(_) => {
                info!(errors = %response.errors(), "Pushover sound lookup failed");
                false
            }
            None => false,
        }
    }

    /// 发送消息
    pub fn post_message(&self, message: &PushoverMessage, token: &str) -> ApiResponse {
        self.query(
            ApiFunction::Message,
            HttpMethod::Post,
            token,
            message.form(token),
            Vec::new(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::transport::HttpResponse;
    use anyhow::{anyhow, Result};
    use serde_json::json;
    use std::sync::Mutex;

    /// 按顺序返回预设响应，并记录收到的请求
    struct ScriptedTransport {
        responses: Mutex<Vec<Result<HttpResponse>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<HttpResponse>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl HttpTransport for ScriptedTransport {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses.lock().unwrap().remove(0)
        }
    }

    fn reply(status: u16, body: &str) -> Result<HttpResponse> {
        Ok(HttpResponse {
            status,
            body: body.to_string(),
        })
    }

    #[test]
    fn test_url_building() {
        let client = PushoverClient::new(ScriptedTransport::new(vec![]));
        assert_eq!(client.url(ApiFunction::Message), "https://api.pushover.net/1/messages.json");

        let client = client.with_base_url("http://localhost:8080/").with_api_version("2");
        assert_eq!(client.url(ApiFunction::ValidateUser), "http://localhost:8080/2/users/validate.json");
    }

    #[test]
    fn test_query_without_token_makes_no_request() {
        let transport = ScriptedTransport::new(vec![]);
        let client = PushoverClient::new(transport.clone());

        let response = client.query(ApiFunction::Message, HttpMethod::Post, "", vec![], vec![]);

        assert!(!response.ok);
        assert_eq!(response.payload, json!(MISSING_TOKEN_MESSAGE));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_query_status_zero_is_failure() {
        let transport = ScriptedTransport::new(vec![reply(200, r#"{"status":0,"errors":["bad"]}"#)]);
        let client = PushoverClient::new(transport);

        let response = client.query(ApiFunction::Message, HttpMethod::Post, "t", vec![], vec![]);
        assert!(!response.ok);
        assert_eq!(response.errors(), "bad");
    }

    #[test]
    fn test_query_missing_status_is_success() {
        let transport = ScriptedTransport::new(vec![reply(200, r#"{"request":"abc"}"#)]);
        let client = PushoverClient::new(transport);

        let response = client.query(ApiFunction::Message, HttpMethod::Post, "t", vec![], vec![]);
        assert!(response.ok);
        assert_eq!(response.payload["request"], json!("abc"));
    }

    #[test]
    fn test_query_unparseable_success_body_is_failure() {
        let transport = ScriptedTransport::new(vec![reply(200, "OK")]);
        let client = PushoverClient::new(transport);

        let response = client.query(ApiFunction::Message, HttpMethod::Post, "t", vec![], vec![]);
        assert!(!response.ok);
        assert_eq!(response.payload, json!("OK"));
    }

    #[test]
    fn test_query_unparseable_error_keeps_raw_body() {
        let transport = ScriptedTransport::new(vec![reply(502, "<html>Bad Gateway</html>")]);
        let client = PushoverClient::new(transport);

        let response = client.query(ApiFunction::Message, HttpMethod::Post, "t", vec![], vec![]);
        assert!(!response.ok);
        assert_eq!(response.payload, json!("<html>Bad Gateway</html>"));
    }

    #[test]
    fn test_query_error_status_with_json_body() {
        let transport = ScriptedTransport::new(vec![reply(400, r#"{"status":0,"errors":["user invalid"]}"#)]);
        let client = PushoverClient::new(transport);

        let response = client.query(ApiFunction::ValidateUser, HttpMethod::Post, "t", vec![], vec![]);
        assert!(!response.ok);
        assert_eq!(response.status(), Some(0));
    }

    #[test]
    fn test_query_transport_failure() {
        let transport = ScriptedTransport::new(vec![Err(anyhow!("connection refused"))]);
        let client = PushoverClient::new(transport);

        let response = client.query(ApiFunction::Message, HttpMethod::Post, "t", vec![], vec![]);
        assert!(!response.ok);
        assert!(response.payload.as_str().unwrap().contains("connection refused"));
    }

    #[test]
    fn test_validate_user() {
        let transport = ScriptedTransport::new(vec![
            reply(200, r#"{"status":1}"#),
            reply(400, r#"{"status":0,"errors":["user key is invalid"]}"#),
        ]);
        let client = PushoverClient::new(transport.clone());

        assert!(client.validate_user("u", Some("phone"), "t"));
        assert!(!client.validate_user("u", None, "t"));

        let requests = transport.requests();
        assert_eq!(requests[0].method, HttpMethod::Post);
        assert!(requests[0].form.contains(&("device".to_string(), "phone".to_string())));
        assert!(!requests[1].form.iter().any(|(k, _)| k == "device"));
    }

    #[test]
    fn test_validate_sound_object_and_array() {
        let transport = ScriptedTransport::new(vec![
            reply(200, r#"{"status":1,"sounds":{"pushover":"Pushover (default)","siren":"Siren"}}"#),
            reply(200, r#"{"status":1,"sounds":["pushover","siren"]}"#),
            reply(200, r#"{"status":1,"sounds":{"pushover":"Pushover (default)"}}"#),
        ]);
        let client = PushoverClient::new(transport.clone());

        assert!(client.validate_sound("siren", "t"));
        assert!(client.validate_sound("siren", "t"));
        assert!(!client.validate_sound("klaxon", "t"));

        let requests = transport.requests();
        assert_eq!(requests[0].method, HttpMethod::Get);
        assert_eq!(requests[0].query, vec![("token".to_string(), "t".to_string())]);
        assert!(requests[0].url.ends_with("/1/sounds.json"));
    }

    #[test]
    fn test_message_form_omits_unset_fields() {
        let message = PushoverMessage {
            user: "u".to_string(),
            message: "hello".to_string(),
            priority: Some("0".to_string()),
            ..Default::default()
        };

        let form = message.form("t");
        let keys: Vec<&str> = form.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["user", "token", "priority", "message"]);
    }
}
