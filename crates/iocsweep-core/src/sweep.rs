//! 扫描主流程与并行调度
//!
//! 生命周期：Idle → Collecting → Dispatching → Draining → Done
//! - Collecting：校验并加载 IOC 哈希集合（缺失即致命），遍历扫描根目录
//! - Dispatching：一次性填满任务队列；为空则直接结束
//! - Draining：固定大小线程池消费队列；队列变空后发出停止信号，并 join 全部 worker
//!   （队列为空不代表在途任务已完成）
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

use tracing::{debug, info};

use crate::collect::collect_files;
use crate::detect::{Inspection, Inspector};
use crate::error::{ScanError, SweepError};
use crate::filter::ExclusionList;
use crate::findings::{sort_findings_stable, Finding};
use crate::hashset::ReferenceHashSet;
use crate::options::SweepOptions;
use crate::progress::ProgressReporter;
use crate::queue::{lock, CancelToken, WorkQueue};
use crate::report::{SweepOutcome, SweepReport};
use crate::signature::{NoSignatures, SignatureEngine};
use crate::sink::ResultSink;

/// 扫描阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepPhase {
    Idle,
    Collecting,
    Dispatching,
    Draining,
    Done,
}

/// 扫描协调者：由调用方持有，配置与协作者在构造时传入，无全局状态
pub struct Sweep {
    options: SweepOptions,
    sink: ResultSink,
    signatures: Arc<dyn SignatureEngine>,
    cancel: CancelToken,
    phase: Mutex<SweepPhase>,
}

impl Sweep {
    pub fn new(options: SweepOptions, sink: ResultSink) -> Self {
        Self {
            options,
            sink,
            signatures: Arc::new(NoSignatures),
            cancel: CancelToken::new(),
            phase: Mutex::new(SweepPhase::Idle),
        }
    }

    /// 配置签名引擎（默认不启用）
    pub fn with_signatures(mut self, engine: Arc<dyn SignatureEngine>) -> Self {
        self.signatures = engine;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn phase(&self) -> SweepPhase {
        *lock(&self.phase)
    }

    fn enter(&self, phase: SweepPhase) {
        debug!(?phase, "sweep phase");
        *lock(&self.phase) = phase;
    }

    /// 执行一次完整扫描
    pub fn run(&self) -> Result<SweepReport, SweepError> {
        let started = Instant::now();
        self.enter(SweepPhase::Collecting);

        let hashes = match ReferenceHashSet::load(&self.options.hash_set_path) {
            Ok(h) => Arc::new(h),
            Err(err) => {
                self.sink.append_error(&format!("Error: {err}"));
                self.enter(SweepPhase::Done);
                return Err(err);
            }
        };
        info!(hashes = hashes.len(), "reference hash set loaded");

        let exclusions = ExclusionList::new(&self.options.exclusions);
        debug!(excluded = ?exclusions.entries(), "exclusion list");
        info!(root = %self.options.scan_root.display(), "collecting files");
        let collection = collect_files(&self.options.scan_root, &exclusions);
        let directories_visited = collection.directories.len();

        self.enter(SweepPhase::Dispatching);
        let queue = WorkQueue::new();
        let total = queue.fill(collection.into_tasks());
        let mut report = SweepReport {
            outcome: SweepOutcome::NothingToScan,
            scan_root: self.options.scan_root.clone(),
            files_total: total,
            files_processed: 0,
            directories_visited,
            workers: 0,
            findings: Vec::new(),
            errors: Vec::new(),
            output_log: self.sink.output_location().map(|p| p.to_path_buf()),
            error_log: self.sink.error_location().map(|p| p.to_path_buf()),
            elapsed_ms: 0,
        };
        if total == 0 {
            info!("no files to scan");
            self.enter(SweepPhase::Done);
            report.elapsed_ms = started.elapsed().as_millis() as u64;
            return Ok(report);
        }

        let inspector = Inspector::new(hashes)
            .with_extension(self.options.suspicious_extension.as_str())
            .with_signatures(Arc::clone(&self.signatures));
        let workers = self.options.worker_count();
        info!(files = total, workers, signatures = self.signatures.name(), "scanning");

        self.enter(SweepPhase::Draining);
        let progress = ProgressReporter::new(total, self.options.progress);
        let recorder = Recorder::new(&self.sink, &progress);
        let worker = Worker { queue: &queue, inspector: &inspector, progress: &progress, recorder: &recorder, cancel: &self.cancel };
        let drained = drain(&worker, workers);
        progress.finish();
        self.enter(SweepPhase::Done);
        let processed = drained?;

        let (mut findings, mut errors) = recorder.into_parts();
        sort_findings_stable(&mut findings);
        errors.sort_by(|a, b| a.path.cmp(&b.path));

        report.outcome = if processed < total { SweepOutcome::Cancelled } else { SweepOutcome::Completed };
        report.files_processed = processed;
        report.workers = workers;
        report.findings = findings;
        report.errors = errors;
        report.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            processed,
            findings = report.findings.len(),
            errors = report.errors.len(),
            elapsed_ms = report.elapsed_ms,
            "sweep finished"
        );
        Ok(report)
    }
}

/// 检出与错误的累积；各自一把锁，写日志与入列分别加锁，不会同时持有两把
/// 写日志时进度条暂时让出终端（调试镜像与写失败告警也走 stderr）
struct Recorder<'a> {
    sink: &'a ResultSink,
    progress: &'a ProgressReporter,
    findings: Mutex<Vec<Finding>>,
    errors: Mutex<Vec<ScanError>>,
}

impl<'a> Recorder<'a> {
    fn new(sink: &'a ResultSink, progress: &'a ProgressReporter) -> Self {
        Self { sink, progress, findings: Mutex::new(Vec::new()), errors: Mutex::new(Vec::new()) }
    }

    fn record(&self, inspection: Inspection) {
        for finding in inspection.findings {
            self.progress.suspend(|| self.sink.append_output(&finding.to_string()));
            lock(&self.findings).push(finding);
        }
        if let Some(err) = inspection.error {
            self.progress.suspend(|| self.sink.append_error(&err.to_string()));
            lock(&self.errors).push(err);
        }
    }

    fn into_parts(self) -> (Vec<Finding>, Vec<ScanError>) {
        let findings = self.findings.into_inner().unwrap_or_else(|e| e.into_inner());
        let errors = self.errors.into_inner().unwrap_or_else(|e| e.into_inner());
        (findings, errors)
    }
}

/// 单个 worker 的执行上下文（所有 worker 共享同一份引用）
struct Worker<'a> {
    queue: &'a WorkQueue,
    inspector: &'a Inspector,
    progress: &'a ProgressReporter,
    recorder: &'a Recorder<'a>,
    cancel: &'a CancelToken,
}

impl Worker<'_> {
    /// 循环领取任务直到队列停止；返回本 worker 处理的任务数
    /// 检测流水线在队列锁之外执行
    fn run(&self) -> usize {
        let _guard = AbandonOnPanic(self.queue);
        let mut processed = 0;
        loop {
            if self.cancel.is_cancelled() {
                let dropped = self.queue.abandon();
                if dropped > 0 {
                    self.progress.suspend(|| info!(dropped, "sweep cancelled"));
                }
            }
            let Some(task) = self.queue.pop() else { break };
            let inspection = self.inspector.inspect(task.path());
            self.recorder.record(inspection);
            self.progress.advance();
            processed += 1;
        }
        processed
    }
}

/// worker panic 时放弃剩余任务，避免协调者永远等待队列清空
struct AbandonOnPanic<'a>(&'a WorkQueue);

impl Drop for AbandonOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.abandon();
        }
    }
}

/// 启动 `workers` 个线程消费队列，等待队列清空后发出停止信号并 join 全部线程
fn drain(worker: &Worker<'_>, workers: usize) -> Result<usize, SweepError> {
    thread::scope(|s| {
        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let spawned = thread::Builder::new()
                .name(format!("iocsweep-worker-{id}"))
                .spawn_scoped(s, move || worker.run());
            match spawned {
                Ok(h) => handles.push(h),
                Err(err) => {
                    // 已启动的线程先收尾
                    worker.queue.abandon();
                    for h in handles { let _ = h.join(); }
                    return Err(SweepError::WorkerSpawn(err));
                }
            }
        }

        worker.queue.wait_drained();
        worker.queue.stop();

        let mut processed = 0;
        let mut panicked = false;
        for h in handles {
            match h.join() {
                Ok(n) => processed += n,
                Err(_) => panicked = true,
            }
        }
        if panicked {
            return Err(SweepError::WorkerPanicked);
        }
        Ok(processed)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressMode;
    use crate::error::SignatureError;
    use crate::sink::MemoryLog;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 扫到第 `after` 个文件时触发取消，每个文件都报告一次命中
    struct CancelAfter {
        token: CancelToken,
        after: usize,
        seen: AtomicUsize,
    }

    impl SignatureEngine for CancelAfter {
        fn name(&self) -> &str {
            "cancel-after"
        }

        fn scan_file(&self, _path: &Path) -> Result<Vec<String>, SignatureError> {
            if self.seen.fetch_add(1, Ordering::SeqCst) + 1 == self.after {
                self.token.cancel();
            }
            Ok(vec!["seen".to_string()])
        }
    }

    fn options(root: &std::path::Path, ioc: &std::path::Path) -> SweepOptions {
        let mut opts = SweepOptions::new(root, ioc);
        opts.progress = ProgressMode::Hidden;
        opts
    }

    #[test]
    fn missing_hash_set_is_fatal_before_traversal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("file.rggJ3pSi_l"), b"x").unwrap();
        let out = MemoryLog::new();
        let err = MemoryLog::new();
        let sweep = Sweep::new(options(dir.path(), &dir.path().join("missing.txt")), ResultSink::new(out.clone(), err.clone()));

        assert!(matches!(sweep.run(), Err(SweepError::HashSetMissing { .. })));
        assert!(out.lines().is_empty());
        assert_eq!(err.lines().len(), 1);
        assert!(err.lines()[0].contains("cannot find IOC file"));
        assert_eq!(sweep.phase(), SweepPhase::Done);
    }

    #[test]
    fn empty_root_short_circuits() {
        let root = tempfile::tempdir().unwrap();
        let etc = tempfile::tempdir().unwrap();
        let ioc = etc.path().join("ioc.txt");
        fs::write(&ioc, "").unwrap();
        let sweep = Sweep::new(options(root.path(), &ioc), ResultSink::new(MemoryLog::new(), MemoryLog::new()));
        let report = sweep.run().unwrap();
        assert_eq!(report.outcome, SweepOutcome::NothingToScan);
        assert_eq!(report.files_total, 0);
        assert_eq!(report.workers, 0);
    }

    #[test]
    fn cancelled_before_start_processes_nothing() {
        let root = tempfile::tempdir().unwrap();
        for i in 0..20 {
            fs::write(root.path().join(format!("f{i}.txt")), b"data").unwrap();
        }
        let etc = tempfile::tempdir().unwrap();
        let ioc = etc.path().join("ioc.txt");
        fs::write(&ioc, "").unwrap();
        let sweep = Sweep::new(options(root.path(), &ioc), ResultSink::new(MemoryLog::new(), MemoryLog::new()));
        sweep.cancel_token().cancel();
        let report = sweep.run().unwrap();
        assert_eq!(report.outcome, SweepOutcome::Cancelled);
        assert_eq!(report.files_total, 20);
        assert_eq!(report.files_processed, 0);
    }

    #[test]
    fn cancel_mid_sweep_finishes_in_flight_tasks() {
        let root = tempfile::tempdir().unwrap();
        for i in 0..200 {
            fs::write(root.path().join(format!("f{i:03}.txt")), b"data").unwrap();
        }
        let etc = tempfile::tempdir().unwrap();
        let ioc = etc.path().join("ioc.txt");
        fs::write(&ioc, "").unwrap();
        let out = MemoryLog::new();
        let mut opts = options(root.path(), &ioc);
        opts.workers = Some(2);

        let sweep = Sweep::new(opts, ResultSink::new(out.clone(), MemoryLog::new()));
        let token = sweep.cancel_token();
        let engine = Arc::new(CancelAfter { token, after: 5, seen: AtomicUsize::new(0) });
        let sweep = sweep.with_signatures(engine.clone());
        let report = sweep.run().unwrap();

        assert_eq!(report.outcome, SweepOutcome::Cancelled);
        assert_eq!(report.workers, 2);
        assert!(report.files_processed >= 5);
        assert!(report.files_processed < report.files_total);
        // 每个开始检测的文件都完整走完并记录
        let scanned = engine.seen.load(Ordering::SeqCst);
        assert_eq!(report.files_processed, scanned);
        assert_eq!(report.findings.len(), scanned);
        assert_eq!(out.lines().len(), scanned);
        assert_eq!(sweep.phase(), SweepPhase::Done);
    }
}
