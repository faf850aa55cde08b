//! # 数据模型模块
//!
//! 定义作业配置、调度策略和作业结果。
//!
//! ## 依赖关系
//! - 被 `batch/` 和 `commands/` 使用
//! - 子模块: job, result

pub mod job;
pub mod result;

pub use job::{DispatchStrategy, JobConfig, DEFAULT_CLEANUP_THRESHOLD};
pub use result::JobResult;
