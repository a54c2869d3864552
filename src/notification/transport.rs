//! HTTP 传输层 - 可替换的请求执行接口
//!
//! 生产环境使用 `ReqwestTransport`（阻塞客户端），测试中可注入 mock。

use anyhow::{anyhow, Result};
use std::time::Duration;
use tracing::debug;

/// 默认超时（秒）
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP 方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// HTTP 请求
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    /// URL 查询参数
    pub query: Vec<(String, String)>,
    /// 表单字段（POST body）
    pub form: Vec<(String, String)>,
}

/// HTTP 响应（状态码 + 原始 body）
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP 传输 trait
///
/// 返回 `Err` 仅表示连接层失败（DNS、超时、连接被拒绝等），
/// 任何 HTTP 状态码都应以 `Ok` 返回。
pub trait HttpTransport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// 基于 reqwest 阻塞客户端的传输实现
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow!("Cannot create HTTP client: {}", e))?;

        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if !request.form.is_empty() {
            builder = builder.form(&request.form);
        }

        let start = std::time::Instant::now();
        let response = builder
            .send()
            .map_err(|e| anyhow!("HTTP request failed: {}", e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| anyhow!("Failed to read response: {}", e))?;

        debug!(
            method = request.method.as_str(),
            url = %request.url,
            status,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "HTTP request completed"
        );

        Ok(HttpResponse { status, body })
    }
}
