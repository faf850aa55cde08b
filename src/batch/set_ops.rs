//! # 文件集合运算
//!
//! 对两个发现集合做并、交、差、对称差，并重新计算公共根。
//!
//! ## 依赖关系
//! - 被 `batch/engine.rs` 调用
//! - 使用 `batch/collector.rs` 的 `DiscoveredSet` 和 `common_root`

use super::collector::DiscoveredSet;
use crate::error::{FileBatchError, Result};
use crate::models::JobConfig;

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// 集合运算
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperation {
    Union,
    Intersect,
    Difference,
    SymmetricDifference,
}

impl fmt::Display for SetOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetOperation::Union => write!(f, "union"),
            SetOperation::Intersect => write!(f, "intersect"),
            SetOperation::Difference => write!(f, "difference"),
            SetOperation::SymmetricDifference => write!(f, "symmetric-difference"),
        }
    }
}

impl FromStr for SetOperation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "union" | "or" | "|" => Ok(SetOperation::Union),
            "intersect" | "and" | "&" => Ok(SetOperation::Intersect),
            "difference" | "sub" | "-" => Ok(SetOperation::Difference),
            "symmetric-difference" | "xor" | "^" => Ok(SetOperation::SymmetricDifference),
            other => Err(format!("unknown set operation '{}'", other)),
        }
    }
}

/// 检查两个配置能否做集合运算
///
/// 输入格式与输出格式都必须一致，且不能是流式策略。
/// 在任何文件系统操作之前调用。
pub fn check_compatible(left: &JobConfig, right: &JobConfig) -> Result<()> {
    for config in [left, right] {
        if config.strategy.is_streaming() {
            return Err(FileBatchError::StreamingSetOperation {
                strategy: config.strategy.to_string(),
            });
        }
    }
    if left.input_format != right.input_format {
        return Err(FileBatchError::PatternMismatch {
            left: left.input_format.clone(),
            right: right.input_format.clone(),
        });
    }
    if left.output_format != right.output_format {
        return Err(FileBatchError::PatternMismatch {
            left: left.output_format.clone().unwrap_or_default(),
            right: right.output_format.clone().unwrap_or_default(),
        });
    }
    Ok(())
}

impl DiscoveredSet {
    /// 按运算类型合并两个集合
    pub fn combine(&self, other: &DiscoveredSet, op: SetOperation) -> DiscoveredSet {
        match op {
            SetOperation::Union => self.union(other),
            SetOperation::Intersect => self.intersect(other),
            SetOperation::Difference => self.difference(other),
            SetOperation::SymmetricDifference => self.symmetric_difference(other),
        }
    }

    pub fn union(&self, other: &DiscoveredSet) -> DiscoveredSet {
        rebuild(self.paths().union(other.paths()))
    }

    pub fn intersect(&self, other: &DiscoveredSet) -> DiscoveredSet {
        rebuild(self.paths().intersection(other.paths()))
    }

    pub fn difference(&self, other: &DiscoveredSet) -> DiscoveredSet {
        rebuild(self.paths().difference(other.paths()))
    }

    pub fn symmetric_difference(&self, other: &DiscoveredSet) -> DiscoveredSet {
        rebuild(self.paths().symmetric_difference(other.paths()))
    }
}

fn rebuild<'p>(paths: impl Iterator<Item = &'p PathBuf>) -> DiscoveredSet {
    let paths: BTreeSet<PathBuf> = paths.cloned().collect();
    DiscoveredSet::from_paths(paths)
}
