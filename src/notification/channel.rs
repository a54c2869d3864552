//! Returner trait 定义

use crate::job::JobResult;

/// Returner - 将作业结果投递到外部系统
pub trait Returner: Send + Sync {
    /// returner 名称（用于日志和配置）
    fn name(&self) -> &str;

    /// 投递作业结果，成功返回 true
    ///
    /// 失败只记录日志，不向调用方传播错误。
    fn deliver(&self, job: &JobResult) -> bool;
}
