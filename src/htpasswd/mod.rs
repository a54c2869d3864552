//! htpasswd 凭据文件检查
//!
//! - `primitives`：外部文件操作（存在性、grep、htpasswd 增删改）
//! - `state`：确保用户存在 / 不存在的检查逻辑

pub mod primitives;
pub mod state;

pub use primitives::{CommandResult, FilePrimitives, SystemPrimitives};
pub use state::{
    entry_pattern, EnsureOutcome, HtpasswdChecker, RemoveOutcome, StateResult, UserAbsentOptions,
    UserExistsOptions,
};
