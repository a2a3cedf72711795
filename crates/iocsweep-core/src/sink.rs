//! 结果输出：输出日志与错误日志（只追加）
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::queue::lock;

/// 只追加的行写入端
pub trait LineSink: Send {
    /// 写入一行（实现负责追加换行符）
    fn append(&mut self, line: &str) -> io::Result<()>;

    /// 落盘位置（若有）
    fn location(&self) -> Option<&Path> {
        None
    }
}

/// 磁盘日志文件：创建时清空旧内容，之后逐行追加并刷新
pub struct LogFile {
    path: PathBuf,
    file: File,
}

impl LogFile {
    pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        File::create(&path)?;
        let file = OpenOptions::new().append(true).open(&path)?;
        Ok(Self { path, file })
    }
}

impl LineSink for LogFile {
    fn append(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.file, "{line}")?;
        self.file.flush()
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// 内存日志；克隆共享同一缓冲区，便于测试与嵌入方读取
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }
}

impl LineSink for MemoryLog {
    fn append(&mut self, line: &str) -> io::Result<()> {
        lock(&self.lines).push(line.to_string());
        Ok(())
    }
}

/// 结果汇：输出与错误各自一把锁，互不争用
pub struct ResultSink {
    output: Mutex<Box<dyn LineSink>>,
    errors: Mutex<Box<dyn LineSink>>,
    output_location: Option<PathBuf>,
    error_location: Option<PathBuf>,
    mirror_errors: bool,
}

impl ResultSink {
    pub fn new(output: impl LineSink + 'static, errors: impl LineSink + 'static) -> Self {
        let output_location = output.location().map(Path::to_path_buf);
        let error_location = errors.location().map(Path::to_path_buf);
        Self {
            output: Mutex::new(Box::new(output)),
            errors: Mutex::new(Box::new(errors)),
            output_location,
            error_location,
            mirror_errors: false,
        }
    }

    /// 以两个磁盘文件创建（均被清空）
    pub fn files(output: &Path, errors: &Path) -> io::Result<Self> {
        Ok(Self::new(LogFile::create(output)?, LogFile::create(errors)?))
    }

    /// 调试模式：错误行同时输出到诊断流
    pub fn mirror_errors(mut self, enabled: bool) -> Self {
        self.mirror_errors = enabled;
        self
    }

    pub fn output_location(&self) -> Option<&Path> {
        self.output_location.as_deref()
    }

    pub fn error_location(&self) -> Option<&Path> {
        self.error_location.as_deref()
    }

    pub fn append_output(&self, line: &str) {
        if let Err(err) = lock(&self.output).append(line) {
            warn!(error = %err, "failed to write output log");
        }
    }

    pub fn append_error(&self, line: &str) {
        if let Err(err) = lock(&self.errors).append(line) {
            warn!(error = %err, "failed to write error log");
        }
        if self.mirror_errors {
            warn!(target: "iocsweep::errors", "{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;

    #[test]
    fn log_file_truncates_then_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        fs::write(&path, "stale\n").unwrap();

        let mut log = LogFile::create(&path).unwrap();
        log.append("one").unwrap();
        log.append("two").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
        assert_eq!(log.location(), Some(path.as_path()));
    }

    #[test]
    fn concurrent_appends_never_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.log");
        let err = dir.path().join("err.log");
        let sink = ResultSink::files(&out, &err).unwrap();
        thread::scope(|s| {
            for t in 0..8 {
                let sink = &sink;
                s.spawn(move || {
                    for i in 0..50 {
                        sink.append_output(&format!("worker {t} line {i} {}", "x".repeat(200)));
                        sink.append_error(&format!("worker {t} error {i}"));
                    }
                });
            }
        });
        let text = fs::read_to_string(&out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 400);
        assert!(lines.iter().all(|l| l.starts_with("worker ") && l.ends_with(&"x".repeat(200))));
        assert_eq!(fs::read_to_string(&err).unwrap().lines().count(), 400);
        assert_eq!(sink.output_location(), Some(out.as_path()));
    }

    #[test]
    fn memory_log_is_shared_between_clones() {
        let log = MemoryLog::new();
        let sink = ResultSink::new(log.clone(), MemoryLog::new());
        sink.append_output("hit");
        assert_eq!(log.lines(), vec!["hit".to_string()]);
        assert_eq!(sink.output_location(), None);
    }
}
