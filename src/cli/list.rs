//! # list 子命令 CLI 定义
//!
//! 列出匹配的文件，可选与第二个输入做集合运算
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/list.rs`

use super::job::JobArgs;
use crate::batch::SetOperation;

use clap::Args;
use std::path::PathBuf;

/// list 子命令参数
#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub job: JobArgs,

    /// Second input to combine with, using the same input format
    #[arg(long)]
    pub with: Option<PathBuf>,

    /// Set operation: union, intersect, difference, symmetric-difference
    #[arg(long, default_value = "union")]
    pub op: SetOperation,

    /// Print the summary table only
    #[arg(long, default_value_t = false)]
    pub summary_only: bool,
}
