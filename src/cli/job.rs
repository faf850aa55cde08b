//! # 通用作业参数
//!
//! `copy` 与 `list` 共用的输入、匹配格式和调度参数。
//!
//! ## 依赖关系
//! - 被 `cli/copy.rs`, `cli/list.rs` 展开
//! - 参数传递给 `commands/mod.rs` 组装 `JobConfig`

use crate::models::DispatchStrategy;

use clap::Args;
use std::path::PathBuf;

/// 输入与调度参数
#[derive(Args, Debug, Clone)]
pub struct JobArgs {
    /// Input directory, single file, or text file listing one path per line
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Input format: extension, '\regex', '^glob', or '!' for every file
    #[arg(short = 'f', long = "in-format")]
    pub in_format: Option<String>,

    /// Number of workers (0 = all cores, negative = all but N)
    #[arg(short, long, allow_negative_numbers = true)]
    pub jobs: Option<i64>,

    /// Concurrency strategy: serial, mp, mt, imp (streaming mp) or imt (streaming mt)
    #[arg(long)]
    pub strategy: Option<DispatchStrategy>,

    /// JSON file with job options; command line flags take precedence
    #[arg(long)]
    pub config: Option<PathBuf>,
}
