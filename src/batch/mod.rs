//! # 批量处理模块
//!
//! 递归查找文件并在工作线程池中逐个处理。
//!
//! ## 功能
//! - 输入格式小语言：扩展名 / 正则 / glob / 全部
//! - 自动检测输入类型（目录 / 单文件 / 路径列表）
//! - 文件集合运算
//! - 镜像输出目录
//! - 五种调度策略
//! - 失败作业的空目录清理
//!
//! ## 依赖关系
//! - 被 `commands/` 和库使用者调用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod callback;
pub mod cleanup;
pub mod collector;
pub mod engine;
pub mod mapper;
pub mod pattern;
pub mod runner;
pub mod set_ops;

pub use callback::{Callback, Operation};
pub use cleanup::{CleanupManager, CleanupPolicy, CleanupState};
pub use collector::{common_root, Collected, DiscoveredSet, FileCollector, InputKind};
pub use engine::{FileProcessor, RunSummary};
pub use mapper::OutputMapper;
pub use pattern::PatternSpec;
pub use runner::{effective_worker_count, BatchRunner};
pub use set_ops::SetOperation;
