//! 配置文件（TOML）加载与校验
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// 排除路径：数组，或以 `;` 分隔的单个字符串
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum PrunePaths {
    List(Vec<PathBuf>),
    Joined(String),
}

impl Default for PrunePaths {
    fn default() -> Self {
        PrunePaths::List(Vec::new())
    }
}

impl PrunePaths {
    fn into_paths(self) -> Vec<PathBuf> {
        match self {
            PrunePaths::List(v) => v.into_iter().filter(|p| !p.as_os_str().is_empty()).collect(),
            PrunePaths::Joined(s) => s.split(';').map(str::trim).filter(|s| !s.is_empty()).map(PathBuf::from).collect(),
        }
    }
}

/// 配置文件原始结构（全部可选，校验时统一报告缺失项）
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    scan_dir: Option<PathBuf>,
    #[serde(default)]
    output_file: Option<PathBuf>,
    #[serde(default)]
    error_file: Option<PathBuf>,
    #[serde(default)]
    ioc_file: Option<PathBuf>,
    #[serde(default)]
    prune_paths: PrunePaths,
    #[serde(default)]
    debug: bool,
    #[serde(default)]
    rules_file: Option<PathBuf>,
    #[serde(default)]
    workers: Option<usize>,
    #[serde(default)]
    suspicious_extension: Option<String>,
    #[serde(default)]
    report_file: Option<PathBuf>,
}

/// 校验后的配置
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub scan_dir: PathBuf,
    pub output_file: PathBuf,
    pub error_file: PathBuf,
    pub ioc_file: PathBuf,
    pub prune_paths: Vec<PathBuf>,
    pub debug: bool,
    pub rules_file: Option<PathBuf>,
    pub workers: Option<usize>,
    pub suspicious_extension: String,
    pub report_file: Option<PathBuf>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let txt = std::fs::read_to_string(path).with_context(|| format!("cannot open config file '{}'", path.display()))?;
        Self::parse(&txt).with_context(|| format!("invalid config file '{}'", path.display()))
    }

    pub fn parse(txt: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(txt)?;
        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> Result<Self> {
        fn required(value: Option<PathBuf>, key: &'static str, missing: &mut Vec<&'static str>) -> PathBuf {
            match value {
                Some(p) if !p.as_os_str().is_empty() => p,
                _ => {
                    missing.push(key);
                    PathBuf::new()
                }
            }
        }

        let mut missing = Vec::new();
        let scan_dir = required(raw.scan_dir, "scan_dir", &mut missing);
        let output_file = required(raw.output_file, "output_file", &mut missing);
        let error_file = required(raw.error_file, "error_file", &mut missing);
        let ioc_file = required(raw.ioc_file, "ioc_file", &mut missing);
        if !missing.is_empty() {
            bail!("missing config value(s): {}", missing.join(", "));
        }

        let prune_paths = raw.prune_paths.into_paths();
        if raw.workers == Some(0) {
            bail!("workers must be at least 1");
        }
        let suspicious_extension = match raw.suspicious_extension {
            Some(ext) if !ext.starts_with('.') => bail!("suspicious_extension must start with '.': {ext}"),
            Some(ext) => ext,
            None => iocsweep_core::DEFAULT_SUSPICIOUS_EXTENSION.to_string(),
        };

        Ok(Self {
            scan_dir,
            output_file,
            error_file,
            ioc_file,
            prune_paths,
            debug: raw.debug,
            rules_file: raw.rules_file,
            workers: raw.workers,
            suspicious_extension,
            report_file: raw.report_file,
        })
    }
}

/// `config` 子命令打印的内容
impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Config Info:")?;
        writeln!(f, "  scanDir    : {}", self.scan_dir.display())?;
        writeln!(f, "  outputFile : {}", self.output_file.display())?;
        writeln!(f, "  errorFile  : {}", self.error_file.display())?;
        writeln!(f, "  iocFile    : {}", self.ioc_file.display())?;
        if let Some(rules) = &self.rules_file {
            writeln!(f, "  rulesFile  : {}", rules.display())?;
        }
        writeln!(f, "  extension  : {}", self.suspicious_extension)?;
        writeln!(f, "  debug      : {}", self.debug)?;
        writeln!(f, "  prunePaths :")?;
        if self.prune_paths.is_empty() {
            writeln!(f, "    (none)")?;
        }
        for p in &self.prune_paths {
            writeln!(f, "    {}", p.display())?;
        }
        Ok(())
    }
}
