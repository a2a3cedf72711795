//! 单文件检测流水线：内容哈希、扩展名、签名
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::error::{ScanError, ScanErrorCause};
use crate::findings::Finding;
use crate::hashset::ReferenceHashSet;
use crate::signature::{NoSignatures, SignatureEngine};

/// 哈希读取缓冲区大小
const READ_CHUNK: usize = 64 * 1024;

/// Qilin 勒索软件加密文件使用的扩展名
pub const DEFAULT_SUSPICIOUS_EXTENSION: &str = ".rggJ3pSi_l";

/// 单个文件的检测结果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub findings: Vec<Finding>,
    pub error: Option<ScanError>,
}

/// 检测流水线；所有字段只读，可在 worker 间共享
#[derive(Clone)]
pub struct Inspector {
    hashes: Arc<ReferenceHashSet>,
    extension: String,
    signatures: Arc<dyn SignatureEngine>,
}

impl Inspector {
    pub fn new(hashes: Arc<ReferenceHashSet>) -> Self {
        Self {
            hashes,
            extension: DEFAULT_SUSPICIOUS_EXTENSION.to_string(),
            signatures: Arc::new(NoSignatures),
        }
    }

    /// 可疑扩展名（区分大小写，包含前导的 `.`）
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_signatures(mut self, engine: Arc<dyn SignatureEngine>) -> Self {
        self.signatures = engine;
        self
    }

    /// 对单个文件执行全部检测
    ///
    /// 三项检测相互独立；唯一的联动是读取失败时跳过签名检测（哈希与签名
    /// 同样依赖文件内容），而扩展名检测只看路径，总会执行。
    pub fn inspect(&self, path: &Path) -> Inspection {
        let mut out = Inspection::default();

        let digest = match sha256_file(path) {
            Ok(d) => Some(d),
            Err(err) => {
                out.error = Some(ScanError::io(path, &err));
                None
            }
        };

        if let Some(digest) = &digest {
            if self.hashes.contains(digest) {
                out.findings.push(Finding::hash_match(path, digest.as_str()));
            }
        }

        if has_extension(path, &self.extension) {
            out.findings.push(Finding::suspicious_extension(path, self.extension.as_str()));
        }

        if digest.is_some() {
            match self.signatures.scan_file(path) {
                Ok(rules) => out.findings.extend(rules.into_iter().map(|rule| Finding::signature_match(path, rule))),
                Err(err) => out.error = Some(ScanError::new(path, ScanErrorCause::Signature(err.to_string()))),
            }
        }

        out
    }
}

/// 以固定块流式计算 SHA-256，返回小写十六进制
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    sha256_reader(file)
}

pub fn sha256_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// 精确比较扩展名（含前导 `.`）
fn has_extension(path: &Path, marker: &str) -> bool {
    let Some(ext) = marker.strip_prefix('.') else { return false };
    path.extension().map_or(false, |e| e == ext)
}
