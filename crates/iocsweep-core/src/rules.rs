//! 签名规则文件加载（TOML）
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

/// 单条规则的配置（支持 pattern 或 regex 字段，以及任意字面量列表）
#[derive(Debug, Clone, Deserialize)]
struct RuleEntry {
    pub id: String,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub regex: Option<String>,
    #[serde(default)]
    pub literals: Vec<String>,
}

/// 顶层规则文件结构
#[derive(Debug, Clone, Deserialize)]
struct RuleFile {
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}

/// 归一化后的规则规格
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpec {
    pub id: String,
    pub pattern: Option<String>,
    pub literals: Vec<String>,
}

/// 从 TOML 规则文件加载并归一化为 RuleSpec 列表
pub fn load_rule_specs(path: &Path) -> Result<Vec<RuleSpec>> {
    let txt = std::fs::read_to_string(path).with_context(|| format!("read rules file {}", path.display()))?;
    parse_rule_specs(&txt).with_context(|| format!("parse rules file {}", path.display()))
}

pub fn parse_rule_specs(txt: &str) -> Result<Vec<RuleSpec>> {
    let parsed: RuleFile = toml::from_str(txt)?;
    let mut out = Vec::new();

    for e in parsed.rules {
        // 兼容两种字段名：pattern 或 regex
        let pattern = e.pattern.or(e.regex);
        let literals: Vec<String> = e.literals.into_iter().filter(|l| !l.is_empty()).collect();
        if pattern.is_none() && literals.is_empty() {
            warn!(rule = %e.id, "rule has neither pattern nor literals, skipped");
            continue;
        }
        out.push(RuleSpec { id: e.id, pattern, literals });
    }

    Ok(out)
}
