//! # filebatch - 递归批量文件处理
//!
//! 给定输入根（目录、单个文件或路径列表文件）和输入格式，查找匹配的文件，
//! 为每个文件推导镜像的输出路径，在工作线程池中调用用户提供的处理函数，
//! 并清理失败作业留下的空目录。
//!
//! ## 示例
//! ```no_run
//! use filebatch::{FileProcessor, JobConfig, Operation};
//!
//! let config = JobConfig::new("in", "txt")
//!     .with_output("out")
//!     .with_output_format("md");
//! let processor = FileProcessor::new(
//!     config,
//!     Operation::dual(|input, output| {
//!         std::fs::copy(input, output)?;
//!         Ok(())
//!     }),
//! )?;
//! let summary = processor.run()?;
//! println!("{} of {} done", summary.succeeded(), summary.total_jobs);
//! # Ok::<(), filebatch::FileBatchError>(())
//! ```
//!
//! ## 依赖关系
//! ```text
//! lib.rs
//!   ├── batch/      (收集、映射、分发、清理)
//!   ├── models/     (作业配置与结果)
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   ├── utils/      (输出、进度条、日志)
//!   └── error.rs    (错误处理)
//! ```

pub mod batch;
pub mod cli;
pub mod commands;
pub mod error;
pub mod models;
pub mod utils;

pub use batch::{
    Callback, CleanupPolicy, DiscoveredSet, FileProcessor, Operation, PatternSpec, RunSummary,
    SetOperation,
};
pub use error::{FileBatchError, Result};
pub use models::{DispatchStrategy, JobConfig, JobResult};
