//! # 日志初始化
//!
//! 引擎通过 `tracing` 发出结构化事件（作业失败、超时、清理决策）。
//! 只有指定了日志级别时才安装订阅者；未指定时不产生任何日志输出或文件。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `tracing-subscriber`

use crate::error::{FileBatchError, Result};

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// 安装全局 `fmt` 订阅者
///
/// `level` 为空时什么也不做；`log_file` 给定时写入文件（无 ANSI 颜色），否则写到 stderr。
pub fn init_logging(level: Option<&str>, log_file: Option<&Path>) -> Result<()> {
    let Some(level) = level else {
        return Ok(());
    };

    let filter = EnvFilter::try_new(level)
        .map_err(|e| FileBatchError::Other(format!("Invalid log level '{}': {}", level, e)))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    let installed = match log_file {
        Some(path) => {
            let file = File::create(path).map_err(|e| FileBatchError::FileWriteError {
                path: path.display().to_string(),
                source: e,
            })?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    installed.map_err(|e| FileBatchError::Other(format!("Failed to install logger: {}", e)))
}
