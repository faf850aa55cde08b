//! # 作业结果数据模型
//!
//! 每个作业产出一个 `(输入路径, 输出路径)` 对。
//! 输出路径缺失表示作业失败、没有产出，或处于单数据流模式；
//! `failed` 单独记录处理函数是否出错，单数据流下也能区分成败。
//!
//! ## 依赖关系
//! - 被 `batch/runner.rs`, `batch/cleanup.rs`, `batch/callback.rs` 使用
//! - 被 `commands/` 导出为 CSV 报告

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 单个作业结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    /// 输入文件
    pub input: PathBuf,

    /// 输出文件（缺失 = 失败或单数据流）
    pub output: Option<PathBuf>,

    /// 处理函数返回错误、panic 或超时
    #[serde(default)]
    pub failed: bool,
}

impl JobResult {
    pub fn new(input: impl Into<PathBuf>, output: Option<PathBuf>) -> Self {
        JobResult {
            input: input.into(),
            output,
            failed: false,
        }
    }

    /// 处理函数失败的作业结果
    pub fn failure(input: impl Into<PathBuf>) -> Self {
        JobResult {
            input: input.into(),
            output: None,
            failed: true,
        }
    }

    /// 单数据流作业结果
    pub fn single(input: impl Into<PathBuf>) -> Self {
        Self::new(input, None)
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// 输出是否实际存在于磁盘上
    pub fn has_output(&self) -> bool {
        self.output.as_deref().is_some_and(Path::exists)
    }
}
