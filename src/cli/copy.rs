//! # copy 子命令 CLI 定义
//!
//! 把匹配的文件复制到镜像的输出目录并替换扩展名
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/copy.rs`

use super::job::JobArgs;

use clap::Args;
use std::path::PathBuf;

/// copy 子命令参数
#[derive(Args, Debug)]
pub struct CopyArgs {
    #[command(flatten)]
    pub job: JobArgs,

    /// Output root (or output file when the input is a single matching file)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output extension; empty keeps the stripped base name
    #[arg(short = 'x', long = "out-format")]
    pub out_format: Option<String>,

    /// Failure ratio at which empty directories are swept once at the end
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Per-file timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Delete zero-byte outputs and count them as failed
    #[arg(long, default_value_t = false)]
    pub remove_empty: bool,

    /// Write a CSV report of (input, output) pairs
    #[arg(long)]
    pub report: Option<PathBuf>,
}
