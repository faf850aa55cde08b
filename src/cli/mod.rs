//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `copy`: 镜像复制匹配的文件（双数据流）
//! - `list`: 列出匹配的文件（单数据流，可做集合运算）
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: copy, job, list

pub mod copy;
pub mod job;
pub mod list;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// filebatch - 递归批量文件处理
#[derive(Parser)]
#[command(name = "filebatch")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Recursive batch file processing with mirrored outputs", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level filter (e.g. 'info', 'filebatch=debug'); no logging when omitted
    #[arg(long, global = true, env = "FILEBATCH_LOG")]
    pub log_level: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(short, long, global = true, default_value_t = false)]
    pub quiet: bool,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Copy matching files into a mirrored output tree with a new extension
    Copy(copy::CopyArgs),

    /// List matching files, optionally combined with a second input
    List(list::ListArgs),
}
