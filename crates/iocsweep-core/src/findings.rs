//! 命中项与排序
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// 命中类型及其附带信息
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingKind {
    /// 内容哈希命中 IOC 列表
    HashMatch { sha256: String },
    /// 扩展名命中可疑标记
    SuspiciousExtension { extension: String },
    /// 签名引擎报告的规则
    SignatureMatch { rule: String },
}

impl FindingKind {
    fn rank(&self) -> u8 {
        match self {
            FindingKind::HashMatch { .. } => 0,
            FindingKind::SuspiciousExtension { .. } => 1,
            FindingKind::SignatureMatch { .. } => 2,
        }
    }

    fn detail(&self) -> &str {
        match self {
            FindingKind::HashMatch { sha256 } => sha256,
            FindingKind::SuspiciousExtension { extension } => extension,
            FindingKind::SignatureMatch { rule } => rule,
        }
    }
}

/// 单个文件上的一次检出
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Finding {
    pub path: PathBuf,
    #[serde(flatten)]
    pub kind: FindingKind,
}

impl Finding {
    pub fn hash_match(path: impl Into<PathBuf>, sha256: impl Into<String>) -> Self {
        Self { path: path.into(), kind: FindingKind::HashMatch { sha256: sha256.into() } }
    }

    pub fn suspicious_extension(path: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self { path: path.into(), kind: FindingKind::SuspiciousExtension { extension: extension.into() } }
    }

    pub fn signature_match(path: impl Into<PathBuf>, rule: impl Into<String>) -> Self {
        Self { path: path.into(), kind: FindingKind::SignatureMatch { rule: rule.into() } }
    }
}

/// 输出日志中的一行
impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FindingKind::HashMatch { sha256 } => write!(f, "Hash match: {} (sha256: {})", self.path.display(), sha256),
            FindingKind::SuspiciousExtension { extension } => {
                write!(f, "Suspicious extension: {} ({})", self.path.display(), extension)
            }
            FindingKind::SignatureMatch { rule } => write!(f, "Signature match: {} (rule: {})", self.path.display(), rule),
        }
    }
}

/// 稳定排序：路径升序 → 类型（哈希/扩展名/签名）→ 附带信息字典序
/// worker 完成顺序不确定，报告输出前统一排序以保证可复现
pub(crate) fn sort_findings_stable(findings: &mut [Finding]) {
    findings.sort_by(|a, b| match a.path.cmp(&b.path) {
        Ordering::Equal => match a.kind.rank().cmp(&b.kind.rank()) {
            Ordering::Equal => a.kind.detail().cmp(b.kind.detail()),
            o => o,
        },
        o => o,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lines() {
        let f = Finding::hash_match("/srv/a/evil.bin", "ab12");
        assert_eq!(f.to_string(), "Hash match: /srv/a/evil.bin (sha256: ab12)");
        let f = Finding::suspicious_extension("/srv/a/x.rggJ3pSi_l", ".rggJ3pSi_l");
        assert_eq!(f.to_string(), "Suspicious extension: /srv/a/x.rggJ3pSi_l (.rggJ3pSi_l)");
        let f = Finding::signature_match("/srv/a/y", "ransom_note");
        assert_eq!(f.to_string(), "Signature match: /srv/a/y (rule: ransom_note)");
    }

    #[test]
    fn sort_orders_by_path_then_kind() {
        let mut v = vec![
            Finding::signature_match("/b", "r2"),
            Finding::suspicious_extension("/a", ".x"),
            Finding::signature_match("/b", "r1"),
            Finding::hash_match("/a", "ff"),
        ];
        sort_findings_stable(&mut v);
        assert_eq!(
            v,
            vec![
                Finding::hash_match("/a", "ff"),
                Finding::suspicious_extension("/a", ".x"),
                Finding::signature_match("/b", "r1"),
                Finding::signature_match("/b", "r2"),
            ]
        );
    }

    #[test]
    fn serializes_with_kind_tag() {
        let v = serde_json::to_value(Finding::hash_match("/a", "ff")).unwrap();
        assert_eq!(v["kind"], "hash_match");
        assert_eq!(v["sha256"], "ff");
        assert_eq!(v["path"], "/a");
    }
}
