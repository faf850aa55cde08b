//! # 统一错误处理模块
//!
//! 定义 filebatch 的所有错误类型，使用 `thiserror` 派生。
//!
//! 配置错误与发现错误都是致命的，在分发前抛出；
//! 单个作业的失败不经过此类型，而是以缺失输出的 `JobResult` 报告。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// filebatch 统一错误类型
#[derive(Error, Debug)]
pub enum FileBatchError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────
    // 配置错误
    // ─────────────────────────────────────────────────────────────
    #[error("Input '{path}' not found")]
    InputNotFound { path: String },

    #[error("Input pattern format must not be empty")]
    EmptyPattern,

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Pattern formats differ: '{left}' vs '{right}'")]
    PatternMismatch { left: String, right: String },

    #[error("Operation expects {expected} flow but the configuration is {actual} flow")]
    OperationMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Output '{path}' must end with the output format '{format}' in single file mode")]
    OutputFormatMismatch { path: String, format: String },

    #[error("Set operations are not available with the streaming strategy '{strategy}'")]
    StreamingSetOperation { strategy: String },

    #[error("Cleanup threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("Invalid configuration file {path}: {reason}")]
    InvalidConfig { path: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // 发现错误
    // ─────────────────────────────────────────────────────────────
    #[error("No files found under '{root}' with pattern '{pattern}'")]
    NoFilesFound { root: String, pattern: String },

    #[error("Path list file cannot be read: {path}")]
    PathListRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────
    // CSV 错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, FileBatchError>;
