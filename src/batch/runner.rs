//! # 批量执行器
//!
//! 按调度策略把作业分发给工作线程并收集结果。
//!
//! ## 功能
//! - 串行：在调用线程上逐个执行
//! - rayon 线程池（`mp`/`imp`）：工作窃取，适合计算密集的处理函数
//! - OS 工作线程（`mt`/`imt`）：固定数量的线程从通道取作业，适合 I/O 密集
//! - 流式策略边遍历边提交，结束时等待所有作业完成
//! - 单个作业的错误或 panic 不会中断批处理
//! - 可选的单作业超时
//!
//! 结果按完成顺序收集，不保证与提交顺序一致。
//!
//! ## 依赖关系
//! - 被 `batch/engine.rs` 调用
//! - 使用 `batch/mapper.rs`, `batch/cleanup.rs`, `batch/callback.rs`
//! - 使用 `rayon` 进行并行计算，`indicatif` 显示进度

use super::callback::{Callback, Operation};
use super::cleanup::CleanupManager;
use super::mapper::OutputMapper;
use crate::error::{FileBatchError, Result};
use crate::models::{DispatchStrategy, JobResult};

use indicatif::ProgressBar;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;
use tracing::warn;

/// 计算实际工作线程数
///
/// - `(0, max]` → 原值
/// - `0` 或大于 `max` → `max`
/// - `(1 - max, 0)` → `max + requested`（保留若干个核心）
/// - 其余 → 1
pub fn effective_worker_count(requested: i64, max_available: usize) -> usize {
    let max = max_available as i64;
    if requested > 0 && requested <= max {
        requested as usize
    } else if requested == 0 || requested > max {
        max_available.max(1)
    } else if 1 - max < requested && requested < 0 {
        (max + requested) as usize
    } else {
        1
    }
}

/// 作业完成后的汇总：进度、回调、清理计数
///
/// 所有完成处理都在同一把锁下串行执行。
pub struct Completion<'a> {
    inner: Mutex<CompletionState>,
    callback: &'a Callback,
    progress: &'a ProgressBar,
}

struct CompletionState {
    cleanup: CleanupManager,
    results: Vec<JobResult>,
}

impl<'a> Completion<'a> {
    pub fn new(cleanup: CleanupManager, callback: &'a Callback, progress: &'a ProgressBar) -> Self {
        Completion {
            inner: Mutex::new(CompletionState {
                cleanup,
                results: Vec::new(),
            }),
            callback,
            progress,
        }
    }

    /// 登记新提交的作业（流式策略每发现一个文件调用一次）
    pub fn register(&self, count: usize) {
        self.lock().cleanup.add_jobs(count);
    }

    /// 登记流式发现的作业并扩展进度条
    fn register_streamed(&self) {
        self.register(1);
        self.progress.inc_length(1);
    }

    /// 作业开始前占用输出目录
    pub fn claim(&self, input: &Path) {
        self.lock().cleanup.claim(input);
    }

    /// 处理一个完成的作业，释放 `claim` 占用的输出目录
    pub fn complete(&self, result: JobResult) {
        let mut state = self.lock();
        self.progress.inc(1);
        self.callback.dispatch(&result);
        state.cleanup.release(result.input());
        state.cleanup.on_job_result(&result);
        state.results.push(result);
    }

    /// 结束收集，返回清理管理器和按完成顺序排列的结果
    pub fn into_parts(self) -> (CleanupManager, Vec<JobResult>) {
        let state = self.inner.into_inner().unwrap_or_else(|e| e.into_inner());
        (state.cleanup, state.results)
    }

    fn lock(&self) -> MutexGuard<'_, CompletionState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// 批量执行器
pub struct BatchRunner<'a> {
    /// 用户处理函数
    operation: &'a Operation,
    /// 双数据流模式下的输出映射
    mapper: Option<&'a OutputMapper>,
    /// 并行作业数
    jobs: usize,
    /// 单作业超时
    timeout: Option<Duration>,
}

impl<'a> BatchRunner<'a> {
    /// 创建新的批量执行器，`requested` 按 `effective_worker_count` 换算
    pub fn new(operation: &'a Operation, mapper: Option<&'a OutputMapper>, requested: i64) -> Self {
        Self {
            operation,
            mapper,
            jobs: effective_worker_count(requested, num_cpus::get()),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// 直接指定工作线程数，不按 CPU 数换算
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// 按策略执行所有作业
    ///
    /// `jobs` 为流式策略时是惰性遍历器，否则是已物化的文件列表。
    /// 非流式策略的作业总数由调用者预先登记。函数在所有作业完成后返回。
    pub fn run<I>(&self, strategy: DispatchStrategy, jobs: I, sink: &Completion<'_>) -> Result<()>
    where
        I: Iterator<Item = PathBuf>,
    {
        let streaming = strategy.is_streaming();
        if strategy == DispatchStrategy::Serial || self.jobs == 1 {
            for input in jobs {
                if streaming {
                    sink.register_streamed();
                }
                self.process(&input, sink);
            }
            return Ok(());
        }

        match strategy {
            DispatchStrategy::ProcessPool | DispatchStrategy::ProcessPoolStreaming => {
                self.run_rayon(jobs, streaming, sink)
            }
            DispatchStrategy::ThreadPool | DispatchStrategy::ThreadPoolStreaming => {
                self.run_threads(jobs, streaming, sink);
                Ok(())
            }
            DispatchStrategy::Serial => Ok(()),
        }
    }

    /// rayon 线程池
    fn run_rayon<I>(&self, jobs: I, streaming: bool, sink: &Completion<'_>) -> Result<()>
    where
        I: Iterator<Item = PathBuf>,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| FileBatchError::Other(format!("Failed to build thread pool: {}", e)))?;

        if streaming {
            // 调用线程负责遍历和提交，作用域结束即为等待所有作业的屏障
            pool.in_place_scope(|scope| {
                for input in jobs {
                    sink.register_streamed();
                    scope.spawn(move |_| self.process(&input, sink));
                }
            });
        } else {
            use rayon::prelude::*;

            let files: Vec<PathBuf> = jobs.collect();
            pool.install(|| {
                files
                    .par_iter()
                    .for_each(|input| self.process(input, sink));
            });
        }
        Ok(())
    }

    /// 固定数量的 OS 工作线程，从通道领取作业
    fn run_threads<I>(&self, jobs: I, streaming: bool, sink: &Completion<'_>)
    where
        I: Iterator<Item = PathBuf>,
    {
        let (tx, rx) = mpsc::channel::<PathBuf>();
        let rx = Mutex::new(rx);

        thread::scope(|scope| {
            for _ in 0..self.jobs {
                scope.spawn(|| loop {
                    let next = match rx.lock() {
                        Ok(guard) => guard.recv(),
                        Err(_) => break,
                    };
                    match next {
                        Ok(input) => self.process(&input, sink),
                        Err(_) => break,
                    }
                });
            }

            for input in jobs {
                if streaming {
                    sink.register_streamed();
                }
                if tx.send(input).is_err() {
                    break;
                }
            }
            drop(tx);
        });
    }

    /// 占用输出目录、执行作业并汇报结果
    fn process(&self, input: &Path, sink: &Completion<'_>) {
        sink.claim(input);
        sink.complete(self.execute(input));
    }

    /// 执行单个作业，任何错误都转换为缺失输出的结果
    pub fn execute(&self, input: &Path) -> JobResult {
        let output = match self.mapper {
            Some(mapper) => match mapper.prepare(input) {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(input = %input.display(), error = %e, "failed to prepare output directory");
                    return JobResult::failure(input);
                }
            },
            None => None,
        };

        self.execute_at(input, output)
    }

    /// 以给定的输出路径执行单个作业（单次处理模式，不做输出映射）
    pub fn execute_at(&self, input: &Path, output: Option<PathBuf>) -> JobResult {
        match self.call(input, output.as_deref()) {
            Ok(()) => JobResult::new(input, output),
            Err(e) => {
                warn!(input = %input.display(), error = %e, "job failed");
                JobResult::failure(input)
            }
        }
    }

    /// 调用用户处理函数，捕获错误、panic 和超时
    fn call(&self, input: &Path, output: Option<&Path>) -> anyhow::Result<()> {
        let Some(timeout) = self.timeout else {
            return guarded(self.operation, input, output);
        };

        let operation = self.operation.clone();
        let input_owned = input.to_path_buf();
        let output_owned = output.map(Path::to_path_buf);
        let (tx, rx) = mpsc::channel();

        // 超时后线程无法被取消，只是不再等待它
        thread::spawn(move || {
            let result = guarded(&operation, &input_owned, output_owned.as_deref());
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(input = %input.display(), timeout_secs = timeout.as_secs(), "job timed out");
                anyhow::bail!("timed out after {:?}", timeout)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                anyhow::bail!("worker exited without a result")
            }
        }
    }
}

/// 在 panic 边界内调用处理函数
fn guarded(operation: &Operation, input: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    match panic::catch_unwind(AssertUnwindSafe(|| operation.call(input, output))) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            anyhow::bail!("panicked: {}", message)
        }
    }
}
