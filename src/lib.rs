//! Returner Plugins - 作业结果推送与 htpasswd 凭据检查

pub mod cli;
pub mod config;
pub mod htpasswd;
pub mod job;
pub mod notification;

pub use config::{resolve_config, ConfigFile, OptionMap};
pub use job::JobResult;
pub use notification::{PushoverOptions, PushoverReturner, Returner, ReturnerError};
pub use notification::{ApiResponse, HttpTransport, ReqwestTransport};
pub use htpasswd::{EnsureOutcome, FilePrimitives, HtpasswdChecker, RemoveOutcome, StateResult, SystemPrimitives};
pub use htpasswd::{UserAbsentOptions, UserExistsOptions};
