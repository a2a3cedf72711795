//! 路径过滤：判断条目是否位于排除子树之下
use std::path::{Component, Path, PathBuf};

/// 排除目录列表（有序）
/// 构建时预先规范化每个条目，之后只读
#[derive(Debug, Clone, Default)]
pub struct ExclusionList {
    entries: Vec<PathBuf>,
}

impl ExclusionList {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let entries = paths.into_iter().map(|p| weakly_canonical(p.as_ref())).collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// `path` 等于任一排除条目或位于其之下时返回 true；空列表不排除任何路径
    /// 符号链接判断由调用方在此之前完成
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let candidate = weakly_canonical(path);
        self.entries.iter().any(|excluded| candidate.starts_with(excluded))
    }
}

/// 规范化路径，但不要求路径存在：
/// - 相对路径以当前工作目录为基准
/// - 最长的已存在前缀交给 `canonicalize`（解析中间的符号链接）
/// - 剩余部分按字面处理 `.` 与 `..`
pub fn weakly_canonical(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };
    let absolute = lexical_normalize(&absolute);

    // 自底向上寻找可解析的前缀
    let mut existing = absolute.as_path();
    let mut rest: Vec<&std::ffi::OsStr> = Vec::new();
    loop {
        if let Ok(resolved) = existing.canonicalize() {
            let mut out = resolved;
            for part in rest.iter().rev() { out.push(part); }
            return out;
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name);
                existing = parent;
            }
            _ => return absolute,
        }
    }
}

/// 纯字面地消解 `.` 与 `..`（根目录之上的 `..` 被丢弃）
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
