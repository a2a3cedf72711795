//! IOC 哈希集合加载
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::error::SweepError;

/// 已知恶意内容哈希（小写十六进制）集合
/// 加载一次，扫描期间只读，可跨线程共享
#[derive(Debug, Clone, Default)]
pub struct ReferenceHashSet {
    hashes: HashSet<String>,
}

impl ReferenceHashSet {
    /// 从 IOC 文件加载
    /// - 文件不存在：`HashSetMissing`
    /// - 无法打开或读取：`HashSetUnreadable`
    pub fn load(path: &Path) -> Result<Self, SweepError> {
        if !path.exists() {
            return Err(SweepError::HashSetMissing { path: path.to_path_buf() });
        }
        let unreadable = |source| SweepError::HashSetUnreadable { path: path.to_path_buf(), source };
        let file = File::open(path).map_err(unreadable)?;
        Self::from_reader(BufReader::new(file)).map_err(unreadable)
    }

    /// 逐行解析（按原始字节，描述列允许任意编码）：
    /// - 空行与 `#` 注释忽略；去掉行尾 `\r`
    /// - 行内可附带描述（`<hash>;<desc>` 或空白分隔），仅取第一个字段
    /// - 统一转为小写，重复项自动合并
    pub fn from_reader<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut hashes = HashSet::new();
        for line in reader.split(b'\n') {
            let line = line?;
            let line = line.trim_ascii();
            if line.is_empty() || line.starts_with(b"#") { continue; }
            let hash = line.split(|b| *b == b';' || b.is_ascii_whitespace()).next().unwrap_or_default();
            if !hash.is_empty() {
                hashes.insert(String::from_utf8_lossy(hash).to_ascii_lowercase());
            }
        }
        Ok(Self { hashes })
    }

    pub fn contains(&self, digest: &str) -> bool {
        self.hashes.contains(digest)
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ReferenceHashSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let hashes = iter.into_iter().map(|h| h.into().to_ascii_lowercase()).collect();
        Self { hashes }
    }
}
