//! # 输入格式匹配
//!
//! 解析输入格式字符串并判断文件是否为候选文件。
//!
//! ## 语法
//! - `\<regex>` - 对文件名做正则搜索（非整体匹配）
//! - `^<glob>`  - 以输入根为起点的递归 glob，例如 `*.cfg`, `sub/*.bin`
//! - `!`        - 不过滤，输入根下的所有文件
//! - 其他       - 扩展名；`?` 只接受不含 `.` 的文件名，`??` 接受所有文件
//!
//! ## 依赖关系
//! - 被 `batch/collector.rs`, `batch/mapper.rs` 使用
//! - 使用 `regex`, `glob`

use crate::error::{FileBatchError, Result};

use glob::{MatchOptions, Pattern};
use regex::Regex;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// 正则前缀
pub const REGEX_SIGIL: char = '\\';
/// glob 前缀
pub const GLOB_SIGIL: char = '^';
/// 跳过过滤前缀
pub const SKIP_SIGIL: char = '!';

const NO_DOT_EXTENSION: &str = "?";
const ANY_EXTENSION: &str = "??";

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// 解析后的输入格式
#[derive(Clone)]
pub enum PatternSpec {
    /// 扩展名（不含 `.`）
    Extension(String),
    /// 对文件名做搜索的正则
    Regex { raw: String, regex: Regex },
    /// 相对输入根的 glob
    Glob { raw: String, pattern: Pattern },
    /// 所有文件
    PassThrough,
}

impl PatternSpec {
    /// 解析输入格式字符串
    ///
    /// 前缀可选，任何字符串都是合法格式；只有正则或 glob 主体
    /// 无法编译时才返回错误。
    pub fn parse(raw: &str) -> Result<Self> {
        if let Some(body) = raw.strip_prefix(REGEX_SIGIL) {
            let regex = Regex::new(body).map_err(|e| FileBatchError::InvalidPattern {
                pattern: raw.to_string(),
                reason: e.to_string(),
            })?;
            Ok(PatternSpec::Regex {
                raw: body.to_string(),
                regex,
            })
        } else if let Some(body) = raw.strip_prefix(GLOB_SIGIL) {
            let pattern = Pattern::new(body).map_err(|e| FileBatchError::InvalidPattern {
                pattern: raw.to_string(),
                reason: e.to_string(),
            })?;
            Ok(PatternSpec::Glob {
                raw: body.to_string(),
                pattern,
            })
        } else if raw.starts_with(SKIP_SIGIL) {
            Ok(PatternSpec::PassThrough)
        } else {
            Ok(PatternSpec::Extension(raw.to_string()))
        }
    }

    /// 是否为扩展名模式
    pub fn is_extension(&self) -> bool {
        matches!(self, PatternSpec::Extension(_))
    }

    /// 判断路径是否为匹配的普通文件
    ///
    /// glob 模式下，路径的任意后缀与 glob 匹配即可。
    pub fn matches(&self, path: &Path) -> bool {
        path.is_file() && self.accepts(path)
    }

    /// 判断 `root` 下的路径是否为匹配的普通文件
    ///
    /// glob 模式相对 `root` 计算，与从 `root` 开始的递归 glob 等价。
    pub fn matches_under(&self, root: &Path, path: &Path) -> bool {
        if !path.is_file() {
            return false;
        }
        match path.strip_prefix(root) {
            Ok(relative) => self.accepts(relative),
            Err(_) => self.accepts(path),
        }
    }

    /// 只看路径文本，不访问文件系统
    fn accepts(&self, path: &Path) -> bool {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => return false,
        };

        match self {
            PatternSpec::Extension(ext) => match ext.as_str() {
                NO_DOT_EXTENSION => !name.contains('.'),
                ANY_EXTENSION => true,
                ext => name.ends_with(&format!(".{}", ext)),
            },
            PatternSpec::Regex { regex, .. } => regex.is_match(name),
            PatternSpec::Glob { pattern, .. } => glob_matches_tail(pattern, path),
            PatternSpec::PassThrough => true,
        }
    }
}

/// 检查路径的各个后缀是否与 glob 匹配
fn glob_matches_tail(pattern: &Pattern, path: &Path) -> bool {
    let parts: Vec<_> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();

    (0..parts.len()).any(|start| {
        let tail: PathBuf = parts[start..].iter().collect();
        pattern.matches_path_with(&tail, GLOB_OPTIONS)
    })
}

impl PartialEq for PatternSpec {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for PatternSpec {}

impl fmt::Display for PatternSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternSpec::Extension(ext) => write!(f, "{}", ext),
            PatternSpec::Regex { raw, .. } => write!(f, "{}{}", REGEX_SIGIL, raw),
            PatternSpec::Glob { raw, .. } => write!(f, "{}{}", GLOB_SIGIL, raw),
            PatternSpec::PassThrough => write!(f, "{}", SKIP_SIGIL),
        }
    }
}

impl fmt::Debug for PatternSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternSpec::Extension(ext) => f.debug_tuple("Extension").field(ext).finish(),
            PatternSpec::Regex { raw, .. } => f.debug_tuple("Regex").field(raw).finish(),
            PatternSpec::Glob { raw, .. } => f.debug_tuple("Glob").field(raw).finish(),
            PatternSpec::PassThrough => write!(f, "PassThrough"),
        }
    }
}
