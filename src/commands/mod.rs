//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `batch/`, `models/`, `utils/`
//! - 子模块: copy, list

pub mod copy;
pub mod list;

use crate::cli::job::JobArgs;
use crate::cli::Commands;
use crate::error::{FileBatchError, Result};
use crate::models::JobConfig;

/// 执行命令
pub fn run(cmd: Commands, quiet: bool) -> Result<()> {
    match cmd {
        Commands::Copy(args) => copy::execute(args, quiet),
        Commands::List(args) => list::execute(args, quiet),
    }
}

/// 由命令行参数组装作业配置
///
/// 给定 `--config` 时先读取 JSON，命令行参数覆盖其中的字段。
pub(crate) fn job_config(args: &JobArgs) -> Result<JobConfig> {
    let mut config = match &args.config {
        Some(path) => JobConfig::from_json_file(path)?,
        None => {
            let input = args.input.clone().ok_or_else(|| {
                FileBatchError::Other("--input is required without --config".to_string())
            })?;
            let format = args.in_format.clone().ok_or_else(|| {
                FileBatchError::Other("--in-format is required without --config".to_string())
            })?;
            JobConfig::new(input, format)
        }
    };

    if let Some(input) = &args.input {
        config.input = input.clone();
    }
    if let Some(format) = &args.in_format {
        config.input_format = format.clone();
    }
    if let Some(jobs) = args.jobs {
        config.workers = jobs;
    }
    if let Some(strategy) = args.strategy {
        config.strategy = strategy;
    }
    Ok(config)
}
