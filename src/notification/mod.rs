//! 通知 - 将作业结果推送到 Pushover
//!
//! # 组成
//! 1. `transport`：可替换的 HTTP 传输（生产用 reqwest 阻塞客户端）
//! 2. `pushover`：Pushover API 调用与响应判定
//! 3. `returner`：选项校验、消息格式化、发送流程
//! 4. `pretty`：返回值的结构化美化输出
//!
//! # 使用示例
//! ```ignore
//! use returner_plugins::notification::{PushoverReturner, PushoverOptions, ReqwestTransport};
//!
//! let transport = Arc::new(ReqwestTransport::new(Duration::from_secs(30))?);
//! let returner = PushoverReturner::new(transport);
//! let options = PushoverOptions::resolve(&config, &job, None);
//! returner.send(&job, &options);
//! ```

pub mod channel;
pub mod pretty;
pub mod pushover;
pub mod returner;
pub mod transport;

pub use channel::Returner;
pub use pretty::{compact, pretty};
pub use pushover::{ApiFunction, ApiResponse, PushoverClient, PushoverMessage};
pub use returner::{format_message, ConfiguredPushover, EnvLookup, PushoverOptions, PushoverReturner, ReturnerError};
pub use transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
