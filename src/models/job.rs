//! # 作业配置数据模型
//!
//! 描述一次批量处理运行的全部输入：输入根、匹配格式、输出根、
//! 输出格式、并发策略、工作线程数和清理阈值。
//!
//! 每个字段都有显式的默认值函数，既可以通过构建器方法设置，
//! 也可以从 JSON 配置文件读取。
//!
//! ## 依赖关系
//! - 被 `batch/` 和 `commands/` 使用
//! - 使用 `serde`, `serde_json`

use crate::error::{FileBatchError, Result};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// 默认清理阈值：失败比例达到该值后改为运行结束时整体清理
pub const DEFAULT_CLEANUP_THRESHOLD: f64 = 0.1;

/// 并发调度策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchStrategy {
    /// 在调用线程上逐个执行
    Serial,
    /// rayon 工作窃取线程池，先收集全部文件
    #[default]
    ProcessPool,
    /// 固定数量的 OS 工作线程，先收集全部文件
    ThreadPool,
    /// rayon 线程池，边遍历边提交
    ProcessPoolStreaming,
    /// OS 工作线程，边遍历边提交
    ThreadPoolStreaming,
}

impl DispatchStrategy {
    /// 是否为流式策略
    pub fn is_streaming(self) -> bool {
        matches!(
            self,
            DispatchStrategy::ProcessPoolStreaming | DispatchStrategy::ThreadPoolStreaming
        )
    }

    /// 流式策略对应的非流式版本（路径列表输入已经物化，无需流式遍历）
    pub fn materialized(self) -> Self {
        match self {
            DispatchStrategy::ProcessPoolStreaming => DispatchStrategy::ProcessPool,
            DispatchStrategy::ThreadPoolStreaming => DispatchStrategy::ThreadPool,
            other => other,
        }
    }
}

impl fmt::Display for DispatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchStrategy::Serial => write!(f, "serial"),
            DispatchStrategy::ProcessPool => write!(f, "mp"),
            DispatchStrategy::ThreadPool => write!(f, "mt"),
            DispatchStrategy::ProcessPoolStreaming => write!(f, "imp"),
            DispatchStrategy::ThreadPoolStreaming => write!(f, "imt"),
        }
    }
}

impl FromStr for DispatchStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "serial" => Ok(DispatchStrategy::Serial),
            "mp" | "process-pool" => Ok(DispatchStrategy::ProcessPool),
            "mt" | "thread-pool" => Ok(DispatchStrategy::ThreadPool),
            "imp" | "process-pool-streaming" => Ok(DispatchStrategy::ProcessPoolStreaming),
            "imt" | "thread-pool-streaming" => Ok(DispatchStrategy::ThreadPoolStreaming),
            other => Err(format!(
                "unknown strategy '{}' (expected serial, mp, mt, imp or imt)",
                other
            )),
        }
    }
}

/// 批量处理作业配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// 输入：目录、单个文件或路径列表文件
    pub input: PathBuf,

    /// 输入匹配格式（`\` 正则, `^` glob, `!` 全部, 其余为扩展名）
    #[serde(alias = "in_format")]
    pub input_format: String,

    /// 输出根目录；缺省时为单数据流模式
    #[serde(default = "default_output")]
    pub output: Option<PathBuf>,

    /// 输出扩展名
    #[serde(default = "default_output_format", alias = "out_format")]
    pub output_format: Option<String>,

    /// 工作线程数（0 = 全部, 负数 = 保留 N 个）
    #[serde(default = "default_workers", alias = "cpu_number")]
    pub workers: i64,

    /// 并发策略
    #[serde(default = "default_strategy")]
    pub strategy: DispatchStrategy,

    /// 清理阈值
    #[serde(default = "default_cleanup_threshold")]
    pub cleanup_threshold: f64,

    /// 单个作业的超时（秒）
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: Option<u64>,

    /// 删除大小为 0 的输出文件并计为空结果
    #[serde(default = "default_remove_empty_outputs")]
    pub remove_empty_outputs: bool,
}

fn default_output() -> Option<PathBuf> {
    None
}

fn default_output_format() -> Option<String> {
    None
}

fn default_workers() -> i64 {
    0
}

fn default_strategy() -> DispatchStrategy {
    DispatchStrategy::default()
}

fn default_cleanup_threshold() -> f64 {
    DEFAULT_CLEANUP_THRESHOLD
}

fn default_job_timeout_secs() -> Option<u64> {
    None
}

fn default_remove_empty_outputs() -> bool {
    false
}

impl JobConfig {
    /// 创建只含必需字段的配置
    pub fn new(input: impl Into<PathBuf>, input_format: impl Into<String>) -> Self {
        JobConfig {
            input: input.into(),
            input_format: input_format.into(),
            output: default_output(),
            output_format: default_output_format(),
            workers: default_workers(),
            strategy: default_strategy(),
            cleanup_threshold: default_cleanup_threshold(),
            job_timeout_secs: default_job_timeout_secs(),
            remove_empty_outputs: default_remove_empty_outputs(),
        }
    }

    /// 从 JSON 文件读取配置
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| FileBatchError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| FileBatchError::InvalidConfig {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = Some(format.into());
        self
    }

    pub fn with_workers(mut self, workers: i64) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_strategy(mut self, strategy: DispatchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_cleanup_threshold(mut self, threshold: f64) -> Self {
        self.cleanup_threshold = threshold;
        self
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout_secs = Some(timeout.as_secs().max(1));
        self
    }

    pub fn with_remove_empty_outputs(mut self, remove: bool) -> Self {
        self.remove_empty_outputs = remove;
        self
    }

    /// 校验配置并把路径转换为绝对路径
    ///
    /// 在任何文件发现之前执行，失败即终止。
    pub fn validate(mut self) -> Result<Self> {
        if self.input_format.is_empty() {
            return Err(FileBatchError::EmptyPattern);
        }
        if !self.input.exists() {
            return Err(FileBatchError::InputNotFound {
                path: self.input.display().to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.cleanup_threshold) {
            return Err(FileBatchError::InvalidThreshold(self.cleanup_threshold));
        }

        self.input = absolute(&self.input)?;
        if let Some(output) = self.output.take() {
            self.output = Some(absolute(&output)?);
            if self.output_format.is_none() {
                self.output_format = Some(String::new());
            }
        }
        Ok(self)
    }

    /// 是否为双数据流模式（输入 + 输出）
    pub fn is_dual_flow(&self) -> bool {
        self.output.is_some()
    }

    /// 输出扩展名，单数据流模式下为空串
    pub fn output_format(&self) -> &str {
        self.output_format.as_deref().unwrap_or("")
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout_secs.map(Duration::from_secs)
    }
}

/// 转换为绝对路径（不要求路径存在）
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| FileBatchError::FileReadError {
        path: ".".to_string(),
        source: e,
    })?;
    Ok(cwd.join(path))
}
