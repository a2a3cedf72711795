//! 扫描选项（模块）
use std::path::PathBuf;

use crate::detect::DEFAULT_SUSPICIOUS_EXTENSION;
use crate::progress::ProgressMode;

/// 线程池下限：受限主机上也保持并行
pub const MIN_WORKERS: usize = 2;

/// 扫描选项
#[derive(Debug, Clone)]
pub struct SweepOptions {
    /// 扫描根目录
    pub scan_root: PathBuf,
    /// IOC 哈希文件路径（必须存在）
    pub hash_set_path: PathBuf,
    /// 排除目录（等于或位于其下的路径都会被跳过）
    pub exclusions: Vec<PathBuf>,
    /// 线程数：None 表示自动（CPU 核数）；实际取值不低于 MIN_WORKERS
    pub workers: Option<usize>,
    /// 可疑扩展名，包含前导 `.`
    pub suspicious_extension: String,
    /// 进度条显示方式
    pub progress: ProgressMode,
}

impl SweepOptions {
    pub fn new(scan_root: impl Into<PathBuf>, hash_set_path: impl Into<PathBuf>) -> Self {
        Self {
            scan_root: scan_root.into(),
            hash_set_path: hash_set_path.into(),
            exclusions: Vec::new(),
            workers: None,
            suspicious_extension: DEFAULT_SUSPICIOUS_EXTENSION.to_string(),
            progress: ProgressMode::default(),
        }
    }

    /// 实际线程池大小：max(MIN_WORKERS, 指定值或 CPU 核数)
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(MIN_WORKERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_count_has_a_floor() {
        let mut opts = SweepOptions::new("/srv", "/etc/ioc.txt");
        opts.workers = Some(1);
        assert_eq!(opts.worker_count(), 2);
        opts.workers = Some(16);
        assert_eq!(opts.worker_count(), 16);
        opts.workers = None;
        assert!(opts.worker_count() >= MIN_WORKERS);
    }
}
