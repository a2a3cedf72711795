//! 签名引擎能力接口
use std::path::Path;

use crate::error::SignatureError;

/// 可插拔的签名匹配引擎：只消费“扫描单个文件”这一契约
/// 实现必须可跨线程共享（多个 worker 同时调用）
pub trait SignatureEngine: Send + Sync {
    /// 引擎名称（日志用）
    fn name(&self) -> &str;

    /// 扫描单个文件，返回命中的规则标识
    fn scan_file(&self, path: &Path) -> Result<Vec<String>, SignatureError>;
}

/// 未配置签名引擎时使用的空实现
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSignatures;

impl SignatureEngine for NoSignatures {
    fn name(&self) -> &str {
        "none"
    }

    fn scan_file(&self, _path: &Path) -> Result<Vec<String>, SignatureError> {
        Ok(Vec::new())
    }
}
