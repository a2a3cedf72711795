//! 错误类型：致命错误（中止整次扫描）与单文件错误（记录后继续）
use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// 致命错误：在扫描开始前（或线程池无法建立时）终止本次运行
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("cannot find IOC file: {}", path.display())]
    HashSetMissing { path: PathBuf },

    #[error("cannot open IOC file: {} ({source})", path.display())]
    HashSetUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to spawn scan worker: {0}")]
    WorkerSpawn(#[source] io::Error),

    #[error("a scan worker panicked")]
    WorkerPanicked,
}

/// 签名引擎在单个文件上的失败
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Engine(String),
}

/// 单文件错误的原因分类
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ScanErrorCause {
    Unreadable(String),
    PermissionDenied(String),
    Signature(String),
}

impl From<&io::Error> for ScanErrorCause {
    fn from(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => ScanErrorCause::PermissionDenied(err.to_string()),
            _ => ScanErrorCause::Unreadable(err.to_string()),
        }
    }
}

impl fmt::Display for ScanErrorCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanErrorCause::Unreadable(msg) => write!(f, "unreadable: {msg}"),
            ScanErrorCause::PermissionDenied(msg) => write!(f, "permission denied: {msg}"),
            ScanErrorCause::Signature(msg) => write!(f, "signature engine failed: {msg}"),
        }
    }
}

/// 单文件错误：永远不会中止整体扫描
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanError {
    pub path: PathBuf,
    pub cause: ScanErrorCause,
}

impl ScanError {
    pub fn new(path: impl Into<PathBuf>, cause: ScanErrorCause) -> Self {
        Self { path: path.into(), cause }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, err: &io::Error) -> Self {
        Self::new(path, ScanErrorCause::from(err))
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cannot scan {}: {}", self.path.display(), self.cause)
    }
}
