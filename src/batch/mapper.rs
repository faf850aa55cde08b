//! # 输出路径映射
//!
//! 把输入文件映射到输出根下的镜像位置，并替换扩展名。
//!
//! ## 规则
//! - 相对目录 = 输入文件所在目录去掉公共根
//! - 输出目录 = 输出根 / 相对目录，作业运行前创建
//! - 扩展名模式下从文件名末尾去掉 `.` + 扩展名（扩展名可含 `.`），
//!   其他模式只去掉最后一个扩展名
//! - 输出格式非空时追加 `.` + 输出格式，否则不追加
//!
//! ## 依赖关系
//! - 被 `batch/runner.rs` 调用
//! - 使用 `batch/pattern.rs`

use super::pattern::PatternSpec;
use crate::error::{FileBatchError, Result};

use std::fs;
use std::path::{Path, PathBuf};

/// 输出路径映射器
#[derive(Debug, Clone)]
pub struct OutputMapper {
    common_root: PathBuf,
    output_root: PathBuf,
    pattern: PatternSpec,
    output_format: String,
}

impl OutputMapper {
    pub fn new(
        common_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        pattern: PatternSpec,
        output_format: impl Into<String>,
    ) -> Self {
        OutputMapper {
            common_root: common_root.into(),
            output_root: output_root.into(),
            pattern,
            output_format: output_format.into(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// 输入文件对应的输出目录
    pub fn output_dir(&self, input: &Path) -> PathBuf {
        let parent = input.parent().unwrap_or_else(|| Path::new(""));
        match parent.strip_prefix(&self.common_root) {
            Ok(relative) => self.output_root.join(relative),
            Err(_) => self.output_root.clone(),
        }
    }

    /// 输入文件对应的输出文件名
    pub fn output_name(&self, input: &Path) -> String {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut out_name = strip_input_extension(&self.pattern, &name);
        if !self.output_format.is_empty() {
            out_name.push('.');
            out_name.push_str(&self.output_format);
        }
        out_name
    }

    /// 只计算输出路径，不访问文件系统
    pub fn map(&self, input: &Path) -> PathBuf {
        self.output_dir(input).join(self.output_name(input))
    }

    /// 计算输出路径并创建输出目录
    ///
    /// `create_dir_all` 对已存在和并发创建的目录都不报错。
    pub fn prepare(&self, input: &Path) -> Result<PathBuf> {
        let dir = self.output_dir(input);
        fs::create_dir_all(&dir).map_err(|e| FileBatchError::FileWriteError {
            path: dir.display().to_string(),
            source: e,
        })?;
        Ok(dir.join(self.output_name(input)))
    }
}

/// 从文件名中去掉输入扩展名
fn strip_input_extension(pattern: &PatternSpec, name: &str) -> String {
    if let PatternSpec::Extension(ext) = pattern {
        if ext == "?" {
            return name.to_string();
        }
        let suffix = format!(".{}", ext);
        if ext != "??" && name.len() > suffix.len() && name.ends_with(&suffix) {
            return name[..name.len() - suffix.len()].to_string();
        }
    }

    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn mapper(pattern: &str, format: &str) -> OutputMapper {
        OutputMapper::new(
            "/in",
            "/out",
            PatternSpec::parse(pattern).unwrap(),
            format,
        )
    }

    #[test]
    fn test_mirrors_relative_directory() {
        let m = mapper("txt", "md");
        assert_eq!(m.map(Path::new("/in/x.txt")), PathBuf::from("/out/x.md"));
        assert_eq!(m.map(Path::new("/in/b/c/y.txt")), PathBuf::from("/out/b/c/y.md"));
    }

    #[test]
    fn test_extension_with_dots_is_stripped_exactly() {
        let m = mapper("tar.gz", "zip");
        assert_eq!(m.map(Path::new("/in/a/pkg.v1.tar.gz")), PathBuf::from("/out/a/pkg.v1.zip"));
    }

    #[test]
    fn test_regex_and_glob_strip_last_extension() {
        let m = mapper("\\.*\\.tmp$", "bak");
        assert_eq!(m.map(Path::new("/in/report.v2.tmp")), PathBuf::from("/out/report.v2.bak"));

        let g = mapper("^*.cfg", "json");
        assert_eq!(g.map(Path::new("/in/sub/app.cfg")), PathBuf::from("/out/sub/app.json"));

        let p = mapper("!", "out");
        assert_eq!(p.map(Path::new("/in/Makefile")), PathBuf::from("/out/Makefile.out"));
    }

    #[test]
    fn test_empty_output_format_appends_nothing() {
        let m = mapper("txt", "");
        assert_eq!(m.map(Path::new("/in/x.txt")), PathBuf::from("/out/x"));

        let no_dot = mapper("?", "");
        assert_eq!(no_dot.map(Path::new("/in/README")), PathBuf::from("/out/README"));
    }

    #[test]
    fn test_prepare_creates_directories_idempotently() {
        let dir = TempDir::new().unwrap();
        let input_root = dir.path().join("in");
        let output_root = dir.path().join("out");
        let m = OutputMapper::new(
            &input_root,
            &output_root,
            PatternSpec::parse("txt").unwrap(),
            "md",
        );
        let input = input_root.join("a/b/y.txt");

        let first = m.prepare(&input).unwrap();
        let second = m.prepare(&input).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, output_root.join("a/b/y.md"));
        assert!(output_root.join("a/b").is_dir());
    }
}
