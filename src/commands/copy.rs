//! # copy 命令实现
//!
//! 把匹配的文件复制到镜像的输出目录，输出扩展名由 `--out-format` 决定。
//!
//! ## 功能
//! - 双数据流批量处理
//! - 失败文件的空目录清理
//! - 可选 CSV 报告
//!
//! ## 依赖关系
//! - 使用 `cli/copy.rs` 定义的参数
//! - 使用 `batch/` 执行
//! - 使用 `utils/output.rs`

use super::job_config;
use crate::batch::{FileProcessor, Operation, RunSummary};
use crate::cli::copy::CopyArgs;
use crate::error::{FileBatchError, Result};
use crate::models::JobConfig;
use crate::utils::output;

use anyhow::Context;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// 执行 copy 命令
pub fn execute(args: CopyArgs, quiet: bool) -> Result<()> {
    output::print_header("Batch copy");

    let config = build_config(&args)?;
    let processor = FileProcessor::new(config, copy_operation())?.with_progress(!quiet);

    output::print_info(&format!(
        "Input '{}' ({}) -> '{}'",
        processor.config().input.display(),
        processor.pattern(),
        processor
            .config()
            .output
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    ));

    let summary = processor.run()?;

    if let Some(report) = &args.report {
        write_report(&summary, report)?;
        output::print_info(&format!("Report written to '{}'", report.display()));
    }

    output::print_separator();
    if summary.empty_or_failed > 0 {
        output::print_warning(&format!(
            "{} of {} file(s) produced no output (cleanup: {:?})",
            summary.empty_or_failed, summary.total_jobs, summary.cleanup
        ));
    }
    output::print_done(&format!(
        "Copied {} of {} file(s)",
        summary.succeeded(),
        summary.total_jobs
    ));
    Ok(())
}

fn build_config(args: &CopyArgs) -> Result<JobConfig> {
    let mut config = job_config(&args.job)?;
    if let Some(output) = &args.output {
        config.output = Some(output.clone());
    }
    if config.output.is_none() {
        return Err(FileBatchError::Other("copy requires --output".to_string()));
    }
    if let Some(format) = &args.out_format {
        config.output_format = Some(format.clone());
    }
    if let Some(threshold) = args.threshold {
        config.cleanup_threshold = threshold;
    }
    if let Some(timeout) = args.timeout {
        config = config.with_job_timeout(Duration::from_secs(timeout));
    }
    if args.remove_empty {
        config.remove_empty_outputs = true;
    }
    Ok(config)
}

/// 复制处理函数
fn copy_operation() -> Operation {
    Operation::dual(|input, output| {
        fs::copy(input, output)
            .with_context(|| format!("copy {} -> {}", input.display(), output.display()))?;
        Ok(())
    })
}

/// CSV 报告中的一行
#[derive(Serialize)]
struct ReportRow {
    input: String,
    output: String,
    status: &'static str,
}

/// 写出 CSV 报告
fn write_report(summary: &RunSummary, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for result in &summary.results {
        let status = if result.is_failed() {
            "failed"
        } else if result.has_output() {
            "ok"
        } else {
            "missing"
        };
        writer.serialize(ReportRow {
            input: result.input().display().to_string(),
            output: result
                .output()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            status,
        })?;
    }
    writer.flush().map_err(|e| FileBatchError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}
