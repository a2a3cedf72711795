//! 公共类型（对外暴露）
use std::path::{Path, PathBuf};

/// 待检测的单个文件任务
/// - 由目录收集器为每个合格文件恰好生成一次
/// - 由恰好一个 worker 消费一次
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    path: PathBuf,
}

impl FileTask {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// 目录收集结果：待扫描文件（按遍历顺序）与访问过的目录（诊断用）
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub files: Vec<PathBuf>,
    pub directories: Vec<PathBuf>,
}

impl Collection {
    /// 转换为任务序列，保持收集顺序
    pub fn into_tasks(self) -> Vec<FileTask> {
        self.files.into_iter().map(FileTask::new).collect()
    }
}
