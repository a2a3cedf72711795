//! 主机 IOC 扫描核心库
//!
//! 设计要点：
//! - 目录收集：深度优先、不跟随符号链接、剪掉排除子树、只收非空普通文件。
//! - 检测流水线：流式 SHA-256 比对 IOC 集合、可疑扩展名、可选签名引擎。
//! - 并行调度：固定大小线程池消费一次性填满的任务队列；每个任务恰好被一个
//!   worker 处理一次，结束以 join 全部 worker 为准。
//! - 单文件失败只记录到错误日志，不会中止整体扫描。

mod collect;
mod detect;
mod detectors;
mod error;
mod filter;
mod findings;
mod hashset;
mod options;
mod progress;
mod queue;
mod report;
mod rules;
mod signature;
mod sink;
mod sweep;
mod types;

pub use collect::collect_files;
pub use detect::{sha256_file, sha256_reader, Inspection, Inspector, DEFAULT_SUSPICIOUS_EXTENSION};
pub use detectors::RuleEngine;
pub use error::{ScanError, ScanErrorCause, SignatureError, SweepError};
pub use filter::{weakly_canonical, ExclusionList};
pub use findings::{Finding, FindingKind};
pub use hashset::ReferenceHashSet;
pub use options::{SweepOptions, MIN_WORKERS};
pub use progress::{ProgressMode, ProgressReporter, ProgressState, BAR_WIDTH};
pub use queue::CancelToken;
pub use report::{write_json_report, SweepOutcome, SweepReport};
pub use rules::{load_rule_specs, parse_rule_specs, RuleSpec};
pub use signature::{NoSignatures, SignatureEngine};
pub use sink::{LineSink, LogFile, MemoryLog, ResultSink};
pub use sweep::{Sweep, SweepPhase};
pub use types::{Collection, FileTask};
