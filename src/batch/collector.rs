//! # 文件收集器
//!
//! 根据输入根和输入格式收集待处理文件集合。
//!
//! ## 功能
//! - 目录输入：递归遍历，保留匹配的文件
//! - 单文件输入且匹配格式：单次处理模式
//! - 单文件输入但不匹配：视为路径列表文件，每行一个路径
//! - 流式遍历，供流式策略边发现边提交
//!
//! ## 依赖关系
//! - 被 `batch/engine.rs`, `batch/set_ops.rs` 调用
//! - 使用 `batch/pattern.rs` 判断候选文件
//! - 使用 `walkdir` 遍历目录

use super::pattern::PatternSpec;
use crate::error::{FileBatchError, Result};

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// 输入根的类型，调用时通过文件系统判断
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// 目录，递归查找
    Directory,
    /// 匹配格式的单个文件
    SingleFile,
    /// 不匹配格式的单个文件，按路径列表读取
    PathList,
}

/// 发现的文件集合
///
/// 创建后不再修改；集合运算产生新的集合。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredSet {
    paths: BTreeSet<PathBuf>,
    common_root: PathBuf,
}

impl DiscoveredSet {
    /// 由路径和公共根直接构造
    pub fn new(paths: BTreeSet<PathBuf>, common_root: PathBuf) -> Self {
        DiscoveredSet { paths, common_root }
    }

    /// 由路径构造，公共根取所有路径的最长公共目录
    pub fn from_paths(paths: BTreeSet<PathBuf>) -> Self {
        let common_root = common_root(&paths).unwrap_or_default();
        DiscoveredSet { paths, common_root }
    }

    pub fn common_root(&self) -> &Path {
        &self.common_root
    }

    pub fn paths(&self) -> &BTreeSet<PathBuf> {
        &self.paths
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.paths.iter()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn into_paths(self) -> BTreeSet<PathBuf> {
        self.paths
    }
}

/// 文件收集结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collected {
    /// 输入根本身就是要处理的文件
    Once(PathBuf),
    /// 需要批量处理的文件集合
    Set(DiscoveredSet),
}

/// 文件收集器
pub struct FileCollector<'a> {
    /// 输入根（绝对路径）
    root: PathBuf,
    /// 输入格式
    pattern: &'a PatternSpec,
}

impl<'a> FileCollector<'a> {
    /// 创建新的文件收集器
    pub fn new(root: impl Into<PathBuf>, pattern: &'a PatternSpec) -> Self {
        Self {
            root: root.into(),
            pattern,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 判断输入根的类型
    pub fn kind(&self) -> Result<InputKind> {
        if self.root.is_dir() {
            Ok(InputKind::Directory)
        } else if self.root.is_file() {
            if self.pattern.matches(&self.root) {
                Ok(InputKind::SingleFile)
            } else {
                Ok(InputKind::PathList)
            }
        } else {
            Err(FileBatchError::InputNotFound {
                path: self.root.display().to_string(),
            })
        }
    }

    /// 收集所有匹配的文件
    ///
    /// 集合为空时返回 `NoFilesFound`；单次处理模式不受此限制。
    pub fn collect(&self) -> Result<Collected> {
        let set = match self.kind()? {
            InputKind::SingleFile => return Ok(Collected::Once(self.root.clone())),
            InputKind::Directory => {
                let paths: BTreeSet<PathBuf> = self.walk().collect();
                DiscoveredSet::new(paths, self.root.clone())
            }
            InputKind::PathList => self.read_path_list()?,
        };

        debug!(
            root = %self.root.display(),
            common_root = %set.common_root().display(),
            count = set.len(),
            "discovered files"
        );

        if set.is_empty() {
            return Err(self.no_files_found());
        }
        Ok(Collected::Set(set))
    }

    /// 惰性遍历目录，按文件系统遍历顺序产出匹配的文件
    pub fn walk(&self) -> impl Iterator<Item = PathBuf> + '_ {
        WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(move |e| self.pattern.matches_under(&self.root, e.path()))
            .map(|e| e.into_path())
    }

    /// 空集合对应的错误
    pub fn no_files_found(&self) -> FileBatchError {
        FileBatchError::NoFilesFound {
            root: self.root.display().to_string(),
            pattern: self.pattern.to_string(),
        }
    }

    /// 读取路径列表文件：每行一个路径，只保留存在且匹配的文件
    fn read_path_list(&self) -> Result<DiscoveredSet> {
        let content =
            fs::read_to_string(&self.root).map_err(|e| FileBatchError::PathListRead {
                path: self.root.display().to_string(),
                source: e,
            })?;

        let cwd = std::env::current_dir().map_err(|e| FileBatchError::FileReadError {
            path: ".".to_string(),
            source: e,
        })?;

        let paths: BTreeSet<PathBuf> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| cwd.join(line))
            .filter(|path| self.pattern.matches(path))
            .collect();

        Ok(DiscoveredSet::from_paths(paths))
    }
}

/// 计算一组文件的最长公共目录
///
/// 按路径分量比较，结果总在目录边界上。空集合返回 `None`。
pub fn common_root<'p, I>(paths: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = &'p PathBuf>,
{
    let mut iter = paths.into_iter();
    let first = iter.next()?;
    let mut common: Vec<_> = first.parent().unwrap_or(first).components().collect();

    for path in iter {
        let dir = path.parent().unwrap_or(path);
        let shared = common
            .iter()
            .zip(dir.components())
            .take_while(|(a, b)| *a == b)
            .count();
        common.truncate(shared);
    }

    Some(common.iter().collect())
}
