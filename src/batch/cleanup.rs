//! # 输出目录清理
//!
//! 统计失败或没有产出的作业，并清理输出根下的空目录。
//!
//! ## 策略
//! - 失败比例低于阈值时，每个失败作业立即从其输出位置向上删除空目录，
//!   直到遇到非空目录或输出根
//! - 运行结束时失败比例达到阈值，则整体删除输出根下的所有空目录，
//!   输出根为空时一并删除
//!
//! 两种策略在一次运行中互斥。清理是尽力而为的，I/O 错误一律忽略。
//! 正在运行的作业占用的输出目录不会被逐个清理删除。
//! 流式运行的作业总数边遍历边增长，失败作业的清理推迟到结束时按最终比例决定。
//!
//! ## 依赖关系
//! - 被 `batch/runner.rs`, `batch/engine.rs` 使用
//! - 使用 `batch/mapper.rs` 推算失败作业的输出位置
//! - 使用 `walkdir` 自底向上遍历

use super::mapper::OutputMapper;
use crate::models::JobResult;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// 清理计数器
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupState {
    /// 已提交的作业数
    pub total_jobs: usize,
    /// 失败或输出为空的作业数
    pub empty_or_failed: usize,
}

impl CleanupState {
    /// 失败比例；没有作业时为 0
    pub fn ratio(&self) -> f64 {
        if self.total_jobs == 0 {
            0.0
        } else {
            self.empty_or_failed as f64 / self.total_jobs as f64
        }
    }
}

/// 本次运行实际采用的清理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupPolicy {
    /// 单数据流，不清理
    Disabled,
    /// 逐个作业向上清理
    Incremental,
    /// 结束时整体清理
    FinalSweep,
}

/// 清理管理器
#[derive(Debug)]
pub struct CleanupManager {
    mapper: Option<OutputMapper>,
    threshold: f64,
    remove_empty_outputs: bool,
    /// 作业总数在运行中增长时，失败作业的清理推迟到结束
    defer_pruning: bool,
    /// 正在运行的作业占用的输出目录及其祖先目录（引用计数）
    in_flight: HashMap<PathBuf, usize>,
    /// 推迟清理的失败作业输出位置
    deferred: Vec<PathBuf>,
    state: CleanupState,
}

impl CleanupManager {
    /// `mapper` 为 `None` 表示单数据流模式，此时所有方法都不做任何事
    pub fn new(mapper: Option<OutputMapper>, threshold: f64, remove_empty_outputs: bool) -> Self {
        CleanupManager {
            mapper,
            threshold,
            remove_empty_outputs,
            defer_pruning: false,
            in_flight: HashMap::new(),
            deferred: Vec::new(),
            state: CleanupState::default(),
        }
    }

    /// 流式运行中作业总数不断增长，失败比例只有在结束时才确定
    pub fn with_deferred_pruning(mut self, defer: bool) -> Self {
        self.defer_pruning = defer;
        self
    }

    pub fn state(&self) -> CleanupState {
        self.state
    }

    /// 登记新提交的作业
    pub fn add_jobs(&mut self, count: usize) {
        self.state.total_jobs += count;
    }

    /// 作业开始前占用其输出目录，占用期间该目录不会被清理
    pub fn claim(&mut self, input: &Path) {
        let Some(mapper) = &self.mapper else {
            return;
        };
        let dir = mapper.output_dir(input);
        for claimed in owned_dirs(mapper.output_root(), &dir) {
            *self.in_flight.entry(claimed.to_path_buf()).or_insert(0) += 1;
        }
    }

    /// 作业结束后释放 `claim` 占用的目录
    pub fn release(&mut self, input: &Path) {
        let Some(mapper) = &self.mapper else {
            return;
        };
        let dir = mapper.output_dir(input);
        for claimed in owned_dirs(mapper.output_root(), &dir) {
            if let Some(count) = self.in_flight.get_mut(claimed) {
                *count -= 1;
                if *count == 0 {
                    self.in_flight.remove(claimed);
                }
            }
        }
    }

    /// 处理一个完成的作业
    pub fn on_job_result(&mut self, result: &JobResult) {
        let Some(mapper) = &self.mapper else {
            return;
        };

        let produced = match result.output() {
            Some(output) => self.keep_output(output),
            None => false,
        };
        if produced {
            return;
        }

        self.state.empty_or_failed += 1;
        let planned = result
            .output
            .clone()
            .unwrap_or_else(|| mapper.map(result.input()));

        if self.defer_pruning {
            self.deferred.push(planned);
        } else if self.state.ratio() < self.threshold {
            prune_upward_until(mapper.output_root(), &planned, |dir| {
                self.in_flight.contains_key(dir)
            });
        }
    }

    /// 运行结束时调用，返回采用的策略
    pub fn finalize(&self) -> CleanupPolicy {
        let Some(mapper) = &self.mapper else {
            return CleanupPolicy::Disabled;
        };

        if self.state.ratio() >= self.threshold {
            debug!(
                output = %mapper.output_root().display(),
                failed = self.state.empty_or_failed,
                total = self.state.total_jobs,
                "sweeping empty output directories"
            );
            remove_empty_dirs(mapper.output_root());
            CleanupPolicy::FinalSweep
        } else {
            for leaf in &self.deferred {
                prune_upward(mapper.output_root(), leaf);
            }
            CleanupPolicy::Incremental
        }
    }

    /// 输出是否有效；大小为 0 的输出按配置删除并视为无效
    fn keep_output(&self, output: &Path) -> bool {
        let Ok(meta) = fs::metadata(output) else {
            return false;
        };
        if self.remove_empty_outputs && meta.is_file() && meta.len() == 0 {
            let _ = fs::remove_file(output);
            return false;
        }
        true
    }
}

/// `dir` 及其位于 `root` 之下的祖先目录，不含 `root`
fn owned_dirs<'p>(root: &'p Path, dir: &'p Path) -> impl Iterator<Item = &'p Path> {
    dir.ancestors()
        .take_while(move |d| *d != root && d.starts_with(root))
}

/// 从 `leaf` 的父目录开始向上删除空目录，不删除 `root` 本身
pub fn prune_upward(root: &Path, leaf: &Path) {
    prune_upward_until(root, leaf, |_| false);
}

/// 同 `prune_upward`，遇到 `busy` 返回 true 的目录时停止
fn prune_upward_until<F>(root: &Path, leaf: &Path, busy: F)
where
    F: Fn(&Path) -> bool,
{
    if leaf.exists() {
        return;
    }

    let mut current = leaf.parent();
    while let Some(dir) = current {
        if dir == root || !dir.starts_with(root) || busy(dir) {
            break;
        }
        if fs::remove_dir(dir).is_err() {
            break;
        }
        current = dir.parent();
    }
}

/// 递归删除 `root` 下的所有空目录，`root` 为空时也删除
///
/// 对同一棵树重复调用不产生任何变化。
pub fn remove_empty_dirs(root: &Path) {
    if !root.is_dir() {
        return;
    }

    let dirs = WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir());

    for entry in dirs {
        // 非空目录删除失败，直接跳过
        let _ = fs::remove_dir(entry.path());
    }

    let _ = fs::remove_dir(root);
}
