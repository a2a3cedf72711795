//! 扫描报告（便于 CLI 打印与 JSON 导出）
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::error::ScanError;
use crate::findings::Finding;

/// 扫描结束方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepOutcome {
    Completed,
    /// 收集结果为空，未启动线程池
    NothingToScan,
    /// 取消信号生效，剩余任务被丢弃
    Cancelled,
}

/// 扫描统计与结果
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub outcome: SweepOutcome,
    pub scan_root: PathBuf,
    pub files_total: usize,
    pub files_processed: usize,
    pub directories_visited: usize,
    pub workers: usize,
    pub findings: Vec<Finding>,
    pub errors: Vec<ScanError>,
    pub output_log: Option<PathBuf>,
    pub error_log: Option<PathBuf>,
    pub elapsed_ms: u64,
}

impl SweepReport {
    pub fn has_findings(&self) -> bool {
        !self.findings.is_empty()
    }
}

/// 以 pretty JSON 写出报告
pub fn write_json_report(report: &SweepReport, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create report file {}", path.display()))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, report).context("serialize report")?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
