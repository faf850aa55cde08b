//! # 批量处理入口
//!
//! `FileProcessor` 把文件收集、输出映射、作业分发、回调和清理串起来。
//!
//! ## 流程
//! 1. 构造时校验配置（失败即终止，不做任何文件发现），
//!    单次处理模式的输出格式也在此检查
//! 2. `run` 先执行 `before` 钩子，再收集文件
//! 3. 输入根是匹配的单个文件时直接处理一次，不进入线程池
//! 4. 否则按调度策略分发，每个完成的作业依次更新进度、回调、清理计数
//! 5. 结束时按失败比例决定是否整体清理输出目录
//!
//! ## 依赖关系
//! - 使用 `batch/` 下的所有子模块
//! - 使用 `models/job.rs` 的 `JobConfig`
//! - 使用 `utils/progress.rs` 创建进度条

use super::callback::{Callback, Operation};
use super::cleanup::{CleanupManager, CleanupPolicy};
use super::collector::{Collected, DiscoveredSet, FileCollector, InputKind};
use super::mapper::OutputMapper;
use super::pattern::PatternSpec;
use super::runner::{BatchRunner, Completion};
use super::set_ops::{check_compatible, SetOperation};
use crate::error::{FileBatchError, Result};
use crate::models::{JobConfig, JobResult};
use crate::utils::progress;

use indicatif::ProgressBar;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// 一次运行的汇总
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// 按完成顺序排列的结果
    pub results: Vec<JobResult>,
    /// 作业总数
    pub total_jobs: usize,
    /// 处理函数出错、panic 或超时的作业数
    pub failed: usize,
    /// 失败或没有产出的作业数（清理计数，单数据流下恒为 0）
    pub empty_or_failed: usize,
    /// 采用的清理策略
    pub cleanup: CleanupPolicy,
}

impl RunSummary {
    /// 成功的作业数
    ///
    /// 双数据流下失败的作业已计入 `empty_or_failed`。
    pub fn succeeded(&self) -> usize {
        self.total_jobs - self.empty_or_failed.max(self.failed)
    }
}

/// 批量文件处理器
pub struct FileProcessor {
    config: JobConfig,
    pattern: PatternSpec,
    operation: Operation,
    callback: Callback,
    before: Option<Box<dyn Fn() + Send + Sync>>,
    show_progress: bool,
    worker_threads: Option<usize>,
}

impl fmt::Debug for FileProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileProcessor")
            .field("config", &self.config)
            .field("pattern", &self.pattern)
            .field("operation", &self.operation)
            .field("callback", &self.callback)
            .field("before", &self.before.is_some())
            .finish()
    }
}

impl FileProcessor {
    /// 校验配置并创建处理器
    ///
    /// 处理函数的数据流必须与配置一致：有输出根时为双数据流。
    pub fn new(config: JobConfig, operation: Operation) -> Result<Self> {
        let config = config.validate()?;
        let pattern = PatternSpec::parse(&config.input_format)?;

        if operation.is_dual() != config.is_dual_flow() {
            return Err(FileBatchError::OperationMismatch {
                expected: operation.flow_name(),
                actual: if config.is_dual_flow() { "dual" } else { "single" },
            });
        }
        check_single_output(&config, &pattern)?;

        Ok(FileProcessor {
            config,
            pattern,
            operation,
            callback: Callback::None,
            before: None,
            show_progress: false,
            worker_threads: None,
        })
    }

    /// 设置作业完成回调
    pub fn with_callback(mut self, callback: Callback) -> Self {
        self.callback = callback;
        self
    }

    /// 设置运行前钩子，在文件收集和分发之前同步执行一次
    pub fn with_before<F>(mut self, before: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.before = Some(Box::new(before));
        self
    }

    /// 是否显示进度条
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// 固定工作线程数，忽略配置中的 `workers` 和 CPU 数
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn pattern(&self) -> &PatternSpec {
        &self.pattern
    }

    fn collector(&self) -> FileCollector<'_> {
        FileCollector::new(&self.config.input, &self.pattern)
    }

    /// 收集文件（不执行任何作业）
    pub fn discover(&self) -> Result<Collected> {
        self.collector().collect()
    }

    /// 收集到的文件数；单次处理模式为 1
    pub fn len(&self) -> Result<usize> {
        Ok(match self.discover()? {
            Collected::Once(_) => 1,
            Collected::Set(set) => set.len(),
        })
    }

    /// 与另一个处理器的文件集合做集合运算
    ///
    /// 两者的输入、输出格式必须一致；检查在文件收集之前完成。
    pub fn combine(&self, other: &FileProcessor, op: SetOperation) -> Result<DiscoveredSet> {
        check_compatible(&self.config, &other.config)?;
        let left = self.discover_set()?;
        let right = other.discover_set()?;
        Ok(left.combine(&right, op))
    }

    fn discover_set(&self) -> Result<DiscoveredSet> {
        match self.discover()? {
            Collected::Set(set) => Ok(set),
            Collected::Once(path) => Ok(DiscoveredSet::from_paths([path].into_iter().collect())),
        }
    }

    /// 执行批量处理
    pub fn run(&self) -> Result<RunSummary> {
        self.run_before();

        let collector = self.collector();
        if self.config.strategy.is_streaming() && collector.kind()? == InputKind::Directory {
            return self.run_streaming(&collector);
        }

        match collector.collect()? {
            Collected::Once(input) => self.run_once(&input),
            Collected::Set(set) => self.dispatch(&set),
        }
    }

    /// 对给定集合执行批量处理（例如集合运算的结果）
    pub fn run_set(&self, set: &DiscoveredSet) -> Result<RunSummary> {
        self.run_before();
        if set.is_empty() {
            return Err(self.collector().no_files_found());
        }
        self.dispatch(set)
    }

    fn run_before(&self) {
        if let Some(before) = &self.before {
            before();
        }
    }

    fn mapper(&self, common_root: &Path) -> Option<OutputMapper> {
        self.config.output.as_ref().map(|output| {
            OutputMapper::new(
                common_root,
                output,
                self.pattern.clone(),
                self.config.output_format(),
            )
        })
    }

    fn runner<'r>(&'r self, mapper: Option<&'r OutputMapper>) -> BatchRunner<'r> {
        let runner = BatchRunner::new(&self.operation, mapper, self.config.workers)
            .with_timeout(self.config.job_timeout());
        match self.worker_threads {
            Some(threads) => runner.with_jobs(threads),
            None => runner,
        }
    }

    fn cleanup(&self, mapper: Option<&OutputMapper>) -> CleanupManager {
        CleanupManager::new(
            mapper.cloned(),
            self.config.cleanup_threshold,
            self.config.remove_empty_outputs,
        )
    }

    /// 物化集合的分发
    fn dispatch(&self, set: &DiscoveredSet) -> Result<RunSummary> {
        let strategy = self.config.strategy.materialized();
        let mapper = self.mapper(set.common_root());
        let runner = self.runner(mapper.as_ref());
        let progress = self.progress_bar(set.len() as u64);

        info!(
            files = set.len(),
            strategy = %strategy,
            workers = runner.jobs(),
            "dispatching jobs"
        );

        let sink = Completion::new(self.cleanup(mapper.as_ref()), &self.callback, &progress);
        sink.register(set.len());
        runner.run(strategy, set.iter().cloned(), &sink)?;
        progress.finish_and_clear();

        Ok(self.finish(sink))
    }

    /// 流式分发：边遍历边提交
    fn run_streaming(&self, collector: &FileCollector<'_>) -> Result<RunSummary> {
        let strategy = self.config.strategy;
        let mapper = self.mapper(collector.root());
        let runner = self.runner(mapper.as_ref());
        let progress = self.progress_bar(0);

        info!(strategy = %strategy, workers = runner.jobs(), "streaming jobs");

        let cleanup = self.cleanup(mapper.as_ref()).with_deferred_pruning(true);
        let sink = Completion::new(cleanup, &self.callback, &progress);
        runner.run(strategy, collector.walk(), &sink)?;
        progress.finish_and_clear();

        let summary = self.finish(sink);
        if summary.total_jobs == 0 {
            return Err(collector.no_files_found());
        }
        Ok(summary)
    }

    fn finish(&self, sink: Completion<'_>) -> RunSummary {
        let (cleanup, results) = sink.into_parts();
        let policy = cleanup.finalize();
        let state = cleanup.state();
        let failed = results.iter().filter(|r| r.is_failed()).count();

        info!(
            total = state.total_jobs,
            failed,
            empty_or_failed = state.empty_or_failed,
            cleanup = ?policy,
            "batch finished"
        );

        RunSummary {
            results,
            total_jobs: state.total_jobs,
            failed,
            empty_or_failed: state.empty_or_failed,
            cleanup: policy,
        }
    }

    /// 单次处理模式：输入根本身是匹配的文件
    ///
    /// 双数据流时输出根即输出文件，其格式已在构造时检查。
    fn run_once(&self, input: &Path) -> Result<RunSummary> {
        debug!(input = %input.display(), "single file mode");

        let output = match &self.config.output {
            Some(output) => {
                if let Some(parent) = output.parent() {
                    fs::create_dir_all(parent).map_err(|e| FileBatchError::FileWriteError {
                        path: parent.display().to_string(),
                        source: e,
                    })?;
                }
                Some(output.clone())
            }
            None => None,
        };

        let result = self.runner(None).execute_at(input, output);
        self.callback.dispatch(&result);

        let empty = usize::from(self.config.is_dual_flow() && !result.has_output());
        let failed = usize::from(result.is_failed());
        Ok(RunSummary {
            results: vec![result],
            total_jobs: 1,
            failed,
            empty_or_failed: empty,
            cleanup: CleanupPolicy::Disabled,
        })
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if self.show_progress {
            progress::create_progress_bar(len, "Processing")
        } else {
            ProgressBar::hidden()
        }
    }
}

/// 单次处理模式下输出根即输出文件，必须以输出格式结尾
fn check_single_output(config: &JobConfig, pattern: &PatternSpec) -> Result<()> {
    let Some(output) = &config.output else {
        return Ok(());
    };
    if !pattern.matches(&config.input) {
        return Ok(());
    }

    let format = config.output_format();
    if !output.to_string_lossy().ends_with(format) {
        return Err(FileBatchError::OutputFormatMismatch {
            path: output.display().to_string(),
            format: format.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DispatchStrategy;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use walkdir::WalkDir;

    fn touch(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    /// 复制输入；`y.txt` 不产出任何文件
    fn copy_except_y() -> Operation {
        Operation::dual(|input, output| {
            if input.ends_with("y.txt") {
                return Ok(());
            }
            fs::copy(input, output)?;
            Ok(())
        })
    }

    fn copy_all() -> Operation {
        Operation::dual(|input, output| {
            fs::copy(input, output)?;
            Ok(())
        })
    }

    fn empty_dirs(root: &Path) -> Vec<PathBuf> {
        WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .filter(|e| fs::read_dir(e.path()).map(|mut d| d.next().is_none()).unwrap_or(false))
            .map(|e| e.into_path())
            .collect()
    }

    #[test]
    fn test_end_to_end_mirrors_tree() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a");
        let output = dir.path().join("out");
        touch(&input, "x.txt", "x");
        touch(&input, "b/y.txt", "y");

        for strategy in [
            DispatchStrategy::Serial,
            DispatchStrategy::ProcessPool,
            DispatchStrategy::ThreadPool,
            DispatchStrategy::ProcessPoolStreaming,
            DispatchStrategy::ThreadPoolStreaming,
        ] {
            let _ = fs::remove_dir_all(&output);
            let config = JobConfig::new(&input, "txt")
                .with_output(&output)
                .with_output_format("md")
                .with_workers(2)
                .with_strategy(strategy);
            let summary = FileProcessor::new(config, copy_all())
                .unwrap()
                .with_worker_threads(2)
                .run()
                .unwrap();

            assert_eq!(summary.total_jobs, 2, "strategy {}", strategy);
            assert_eq!(summary.empty_or_failed, 0);
            assert_eq!(summary.cleanup, CleanupPolicy::Incremental);
            assert_eq!(fs::read_to_string(output.join("x.md")).unwrap(), "x");
            assert_eq!(fs::read_to_string(output.join("b/y.md")).unwrap(), "y");
            assert!(empty_dirs(&output).is_empty());
        }
    }

    #[test]
    fn test_end_to_end_final_sweep_removes_failed_directory() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a");
        let output = dir.path().join("out");
        touch(&input, "x.txt", "x");
        touch(&input, "b/y.txt", "y");

        let config = JobConfig::new(&input, "txt")
            .with_output(&output)
            .with_output_format("md")
            .with_workers(1)
            .with_cleanup_threshold(0.4);
        let summary = FileProcessor::new(config, copy_except_y()).unwrap().run().unwrap();

        assert_eq!(summary.empty_or_failed, 1);
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.cleanup, CleanupPolicy::FinalSweep);
        assert!(output.join("x.md").exists());
        assert!(!output.join("b").exists());
    }

    #[test]
    fn test_incremental_cleanup_below_threshold() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a");
        let output = dir.path().join("out");
        touch(&input, "x.txt", "x");
        touch(&input, "b/y.txt", "y");

        let config = JobConfig::new(&input, "txt")
            .with_output(&output)
            .with_output_format("md")
            .with_workers(1)
            .with_cleanup_threshold(0.9);
        let summary = FileProcessor::new(config, copy_except_y()).unwrap().run().unwrap();

        assert_eq!(summary.cleanup, CleanupPolicy::Incremental);
        assert!(output.join("x.md").exists());
        assert!(!output.join("b").exists());
    }

    #[test]
    fn test_regex_pattern_end_to_end() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in");
        touch(&input, "report.tmp", "1");
        touch(&input, "a/b/old.tmp", "2");
        touch(&input, "report.tmp.bak", "3");

        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let config = JobConfig::new(&input, "\\.*\\.tmp$").with_workers(2);
        let processor = FileProcessor::new(
            config,
            Operation::single(move |p| {
                s.lock().unwrap().push(p.to_path_buf());
                Ok(())
            }),
        )
        .unwrap();

        assert_eq!(processor.len().unwrap(), 2);
        let summary = processor.run().unwrap();
        assert_eq!(summary.cleanup, CleanupPolicy::Disabled);

        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec![input.join("a/b/old.tmp"), input.join("report.tmp")]);
    }

    #[test]
    fn test_callback_and_before_hook() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in");
        touch(&input, "x.txt", "x");
        touch(&input, "y.txt", "y");

        let before_calls = Arc::new(AtomicUsize::new(0));
        let callbacks = Arc::new(AtomicUsize::new(0));
        let b = Arc::clone(&before_calls);
        let c = Arc::clone(&callbacks);

        let config = JobConfig::new(&input, "txt")
            .with_output(dir.path().join("out"))
            .with_output_format("md");
        let processor = FileProcessor::new(config, copy_except_y())
            .unwrap()
            .with_before(move || {
                b.fetch_add(1, Ordering::SeqCst);
            })
            .with_callback(Callback::split(move |input, _| {
                assert!(input.is_file());
                c.fetch_add(1, Ordering::SeqCst);
            }));

        let summary = processor.run().unwrap();
        assert_eq!(before_calls.load(Ordering::SeqCst), 1);
        assert_eq!(callbacks.load(Ordering::SeqCst), 2);
        assert_eq!(summary.results.len(), 2);
    }

    #[test]
    fn test_failing_transform_is_reported_not_raised() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in");
        touch(&input, "x.txt", "x");
        touch(&input, "y.txt", "y");

        let config = JobConfig::new(&input, "txt")
            .with_output(dir.path().join("out"))
            .with_output_format("md")
            .with_strategy(DispatchStrategy::ThreadPool)
            .with_workers(2);
        let operation = Operation::dual(|input, output| {
            anyhow::ensure!(!input.ends_with("y.txt"), "cannot handle y");
            fs::copy(input, output)?;
            Ok(())
        });
        let summary = FileProcessor::new(config, operation)
            .unwrap()
            .with_worker_threads(2)
            .run()
            .unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded(), 1);

        let failed: Vec<_> = summary.results.iter().filter(|r| r.output.is_none()).collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].input.ends_with("y.txt"));
    }

    #[test]
    fn test_streaming_failure_is_pruned_with_final_ratio() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        for i in 0..20 {
            touch(&input, &format!("d{}/f.txt", i), "x");
        }

        for (strategy, threads) in [
            (DispatchStrategy::ProcessPoolStreaming, 1),
            (DispatchStrategy::ThreadPoolStreaming, 2),
        ] {
            let _ = fs::remove_dir_all(&output);
            let calls = Arc::new(AtomicUsize::new(0));
            let c = Arc::clone(&calls);
            let operation = Operation::dual(move |input, output| {
                anyhow::ensure!(c.fetch_add(1, Ordering::SeqCst) > 0, "first job fails");
                fs::copy(input, output)?;
                Ok(())
            });
            let config = JobConfig::new(&input, "txt")
                .with_output(&output)
                .with_output_format("md")
                .with_strategy(strategy);
            let summary = FileProcessor::new(config, operation)
                .unwrap()
                .with_worker_threads(threads)
                .run()
                .unwrap();

            assert_eq!(summary.total_jobs, 20);
            assert_eq!(summary.empty_or_failed, 1);
            assert_eq!(summary.cleanup, CleanupPolicy::Incremental);
            assert!(empty_dirs(&output).is_empty(), "strategy {}", strategy);
        }
    }

    #[test]
    fn test_single_flow_failures_are_counted() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in");
        touch(&input, "x.txt", "x");
        touch(&input, "y.txt", "y");

        let config = JobConfig::new(&input, "txt").with_strategy(DispatchStrategy::ProcessPool);
        let operation = Operation::single(|input| {
            anyhow::ensure!(!input.ends_with("y.txt"), "cannot handle y");
            Ok(())
        });
        let summary = FileProcessor::new(config, operation)
            .unwrap()
            .with_worker_threads(2)
            .run()
            .unwrap();

        assert_eq!(summary.empty_or_failed, 0);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded(), 1);
    }

    #[test]
    fn test_do_once_mode() {
        let dir = TempDir::new().unwrap();
        let input = touch(dir.path(), "one.txt", "1");
        let output = dir.path().join("result/one.md");

        let config = JobConfig::new(&input, "txt")
            .with_output(&output)
            .with_output_format("md");
        let summary = FileProcessor::new(config, copy_all()).unwrap().run().unwrap();
        assert_eq!(summary.total_jobs, 1);
        assert_eq!(summary.results[0].output.as_deref(), Some(output.as_path()));
        assert!(output.exists());

        let bad = JobConfig::new(&input, "txt")
            .with_output(dir.path().join("result/one.csv"))
            .with_output_format("md");
        let err = FileProcessor::new(bad, copy_all()).unwrap_err();
        assert!(matches!(err, FileBatchError::OutputFormatMismatch { .. }));
    }

    #[test]
    fn test_path_list_input() {
        let dir = TempDir::new().unwrap();
        let a = touch(dir.path(), "data/r1/a.txt", "a");
        let b = touch(dir.path(), "data/r2/b.txt", "b");
        let list = touch(
            dir.path(),
            "list.lst",
            &format!("{}\n{}\n", a.display(), b.display()),
        );
        let output = dir.path().join("out");

        let config = JobConfig::new(&list, "txt")
            .with_output(&output)
            .with_output_format("md")
            .with_strategy(DispatchStrategy::ThreadPoolStreaming);
        let summary = FileProcessor::new(config, copy_all()).unwrap().run().unwrap();
        assert_eq!(summary.total_jobs, 2);
        assert!(output.join("r1/a.md").exists());
        assert!(output.join("r2/b.md").exists());
    }

    #[test]
    fn test_configuration_errors_fail_fast() {
        let dir = TempDir::new().unwrap();
        let single_for_dual = JobConfig::new(dir.path(), "txt").with_output(dir.path().join("out"));
        let err = FileProcessor::new(single_for_dual, Operation::single(|_| Ok(()))).unwrap_err();
        assert!(matches!(err, FileBatchError::OperationMismatch { .. }));

        let bad_regex = JobConfig::new(dir.path(), "\\(");
        let err = FileProcessor::new(bad_regex, Operation::single(|_| Ok(()))).unwrap_err();
        assert!(matches!(err, FileBatchError::InvalidPattern { .. }));
    }

    #[test]
    fn test_no_files_found() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.md", "a");
        for strategy in [DispatchStrategy::ProcessPool, DispatchStrategy::ThreadPoolStreaming] {
            let config = JobConfig::new(dir.path(), "txt").with_strategy(strategy);
            let err = FileProcessor::new(config, Operation::single(|_| Ok(())))
                .unwrap()
                .run()
                .unwrap_err();
            assert!(matches!(err, FileBatchError::NoFilesFound { .. }));
        }
    }

    #[test]
    fn test_combine_and_run_set() {
        let dir = TempDir::new().unwrap();
        let left_root = dir.path().join("left");
        let right_root = dir.path().join("right");
        touch(&left_root, "x.txt", "x");
        touch(&left_root, "y.txt", "y");
        touch(&right_root, "z.txt", "z");

        let op = || Operation::single(|_| Ok(()));
        let left = FileProcessor::new(JobConfig::new(&left_root, "txt"), op()).unwrap();
        let right = FileProcessor::new(JobConfig::new(&right_root, "txt"), op()).unwrap();

        let union = left.combine(&right, SetOperation::Union).unwrap();
        assert_eq!(union.len(), 3);
        assert_eq!(union.common_root(), dir.path());
        assert!(left
            .combine(&right, SetOperation::Intersect)
            .unwrap()
            .is_empty());

        let summary = left.run_set(&union).unwrap();
        assert_eq!(summary.total_jobs, 3);

        let empty = left.combine(&right, SetOperation::Intersect).unwrap();
        assert!(matches!(
            left.run_set(&empty),
            Err(FileBatchError::NoFilesFound { .. })
        ));

        let other = FileProcessor::new(JobConfig::new(&right_root, "md"), op()).unwrap();
        assert!(matches!(
            left.combine(&other, SetOperation::Union),
            Err(FileBatchError::PatternMismatch { .. })
        ));
    }
}
