//! # 作业与回调
//!
//! `Operation` 是用户提供的单文件处理函数，分为单数据流（只有输入）
//! 和双数据流（输入 + 输出）两种；`Callback` 在每个作业完成后收到结果，
//! 参数个数由变体决定：无参数、结果对、或拆开的两个参数。
//!
//! ## 依赖关系
//! - 被 `batch/runner.rs`, `batch/engine.rs` 使用
//! - 使用 `models/result.rs`

use crate::models::JobResult;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

type SingleFn = dyn Fn(&Path) -> anyhow::Result<()> + Send + Sync;
type DualFn = dyn Fn(&Path, &Path) -> anyhow::Result<()> + Send + Sync;

/// 用户提供的单文件处理函数
#[derive(Clone)]
pub enum Operation {
    /// `do(input)`
    Single(Arc<SingleFn>),
    /// `do(input, output)`，输出文件的父目录已创建
    Dual(Arc<DualFn>),
}

impl Operation {
    pub fn single<F>(f: F) -> Self
    where
        F: Fn(&Path) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Operation::Single(Arc::new(f))
    }

    pub fn dual<F>(f: F) -> Self
    where
        F: Fn(&Path, &Path) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Operation::Dual(Arc::new(f))
    }

    pub fn is_dual(&self) -> bool {
        matches!(self, Operation::Dual(_))
    }

    pub(crate) fn flow_name(&self) -> &'static str {
        if self.is_dual() {
            "dual"
        } else {
            "single"
        }
    }

    /// 调用处理函数；单数据流忽略 `output`
    pub fn call(&self, input: &Path, output: Option<&Path>) -> anyhow::Result<()> {
        match (self, output) {
            (Operation::Single(f), _) => f(input),
            (Operation::Dual(f), Some(output)) => f(input, output),
            (Operation::Dual(_), None) => {
                anyhow::bail!("dual flow operation called without an output path")
            }
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Operation::{}", if self.is_dual() { "Dual" } else { "Single" })
    }
}

/// 作业完成回调
#[derive(Default)]
pub enum Callback {
    /// 不回调
    #[default]
    None,
    /// 无参数通知
    Notify(Box<dyn Fn() + Send + Sync>),
    /// 以 `(input, output)` 整体作为一个参数
    Pair(Box<dyn Fn(&JobResult) + Send + Sync>),
    /// `input`, `output` 作为两个参数
    Split(Box<dyn Fn(&Path, Option<&Path>) + Send + Sync>),
}

impl Callback {
    pub fn notify<F>(f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Callback::Notify(Box::new(f))
    }

    pub fn pair<F>(f: F) -> Self
    where
        F: Fn(&JobResult) + Send + Sync + 'static,
    {
        Callback::Pair(Box::new(f))
    }

    pub fn split<F>(f: F) -> Self
    where
        F: Fn(&Path, Option<&Path>) + Send + Sync + 'static,
    {
        Callback::Split(Box::new(f))
    }

    /// 回调声明的参数个数
    pub fn arity(&self) -> usize {
        match self {
            Callback::None | Callback::Notify(_) => 0,
            Callback::Pair(_) => 1,
            Callback::Split(_) => 2,
        }
    }

    /// 按参数个数把结果转发给回调
    pub fn dispatch(&self, result: &JobResult) {
        match self {
            Callback::None => {}
            Callback::Notify(f) => f(),
            Callback::Pair(f) => f(result),
            Callback::Split(f) => f(result.input(), result.output()),
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback(arity = {})", self.arity())
    }
}
