//! # list 命令实现
//!
//! 列出匹配的文件并统计大小。
//!
//! ## 功能
//! - 单数据流批量处理（统计每个文件的大小）
//! - 可选与第二个输入做集合运算
//! - 汇总表格输出
//!
//! ## 依赖关系
//! - 使用 `cli/list.rs` 定义的参数
//! - 使用 `batch/` 收集、合并、执行
//! - 使用 `utils/output.rs`, `tabled`

use super::job_config;
use crate::batch::{Collected, DiscoveredSet, FileProcessor, Operation};
use crate::cli::list::ListArgs;
use crate::error::Result;
use crate::utils::output;

use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tabled::{Table, Tabled};

/// 执行 list 命令
pub fn execute(args: ListArgs, quiet: bool) -> Result<()> {
    output::print_header("Matching files");

    let bytes = Arc::new(AtomicU64::new(0));
    let processor = FileProcessor::new(job_config(&args.job)?, size_operation(&bytes))?
        .with_progress(!quiet);

    let set = match &args.with {
        Some(other_input) => {
            let mut other_config = job_config(&args.job)?;
            other_config.input = other_input.clone();
            let other = FileProcessor::new(other_config, size_operation(&bytes))?;
            let combined = processor.combine(&other, args.op)?;
            output::print_info(&format!(
                "{} of '{}' and '{}'",
                args.op,
                processor.config().input.display(),
                other.config().input.display()
            ));
            combined
        }
        None => match processor.discover()? {
            Collected::Set(set) => set,
            Collected::Once(path) => DiscoveredSet::from_paths([path].into_iter().collect()),
        },
    };

    if !args.summary_only {
        for path in set.iter() {
            println!("{}", path.display());
        }
        output::print_separator();
    }

    let summary = processor.run_set(&set)?;
    print_summary(&set, summary.total_jobs, bytes.load(Ordering::SeqCst));
    Ok(())
}

/// 统计文件大小的单数据流处理函数
fn size_operation(total: &Arc<AtomicU64>) -> Operation {
    let total = Arc::clone(total);
    Operation::single(move |input| {
        let len = fs::metadata(input)?.len();
        total.fetch_add(len, Ordering::SeqCst);
        Ok(())
    })
}

/// 打印汇总表格
fn print_summary(set: &DiscoveredSet, processed: usize, bytes: u64) {
    #[derive(Tabled)]
    struct SummaryRow {
        #[tabled(rename = "Item")]
        item: &'static str,
        #[tabled(rename = "Value")]
        value: String,
    }

    let rows = vec![
        SummaryRow {
            item: "Common root",
            value: set.common_root().display().to_string(),
        },
        SummaryRow {
            item: "Files",
            value: set.len().to_string(),
        },
        SummaryRow {
            item: "Processed",
            value: processed.to_string(),
        },
        SummaryRow {
            item: "Total size (bytes)",
            value: bytes.to_string(),
        },
    ];
    println!("{}", Table::new(&rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::SetOperation;
    use crate::cli::job::JobArgs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn list_args(input: &Path, with: Option<PathBuf>, op: SetOperation) -> ListArgs {
        ListArgs {
            job: JobArgs {
                input: Some(input.to_path_buf()),
                in_format: Some("log".to_string()),
                jobs: Some(1),
                strategy: None,
                config: None,
            },
            with,
            op,
            summary_only: true,
        }
    }

    #[test]
    fn test_list_counts_sizes() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.log"), "12345").unwrap();
        fs::write(dir.path().join("b.log"), "123").unwrap();

        let bytes = Arc::new(AtomicU64::new(0));
        let op = size_operation(&bytes);
        op.call(&dir.path().join("a.log"), None).unwrap();
        op.call(&dir.path().join("b.log"), None).unwrap();
        assert_eq!(bytes.load(Ordering::SeqCst), 8);

        execute(list_args(dir.path(), None, SetOperation::Union), true).unwrap();
    }

    #[test]
    fn test_list_with_set_operation() {
        let dir = TempDir::new().unwrap();
        let left = dir.path().join("left");
        let right = dir.path().join("right");
        fs::create_dir_all(&left).unwrap();
        fs::create_dir_all(&right).unwrap();
        fs::write(left.join("a.log"), "a").unwrap();
        fs::write(right.join("b.log"), "b").unwrap();

        execute(list_args(&left, Some(right.clone()), SetOperation::Union), true).unwrap();
        assert!(execute(list_args(&left, Some(right), SetOperation::Intersect), true).is_err());
    }
}
