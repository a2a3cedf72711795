//! 目录收集：深度优先遍历扫描根目录，产出待检测文件列表
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::filter::ExclusionList;
use crate::types::Collection;

/// 递归收集 `root` 下所有非空普通文件
///
/// - 无法 stat 的条目（权限不足等）静默跳过
/// - 符号链接一律跳过，且不会沿链接继续深入
/// - 被排除的路径不产出、也不再向下遍历
/// - `root` 不存在或不是目录时返回空结果（不是错误）
///
/// walkdir 内部使用显式栈，目录深度不会放大调用栈
pub fn collect_files(root: &Path, exclusions: &ExclusionList) -> Collection {
    let mut collection = Collection::default();
    if !root.is_dir() {
        debug!(root = %root.display(), "scan root missing or not a directory");
        return collection;
    }

    // depth 0 是根目录本身，交给上面的 is_dir 判定；其余条目在此剪枝
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || (!e.path_is_symlink() && !exclusions.is_excluded(e.path())));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                debug!(error = %err, "skipping entry that cannot be read");
                continue;
            }
        };
        if entry.depth() == 0 { continue; }

        let file_type = entry.file_type();
        if file_type.is_dir() {
            collection.directories.push(entry.into_path());
        } else if file_type.is_file() {
            match entry.metadata() {
                Ok(md) if md.len() > 0 => collection.files.push(entry.into_path()),
                Ok(_) => {}
                Err(err) => debug!(path = %entry.path().display(), error = %err, "cannot stat file"),
            }
        }
    }

    debug!(files = collection.files.len(), directories = collection.directories.len(), "collection finished");
    collection
}
