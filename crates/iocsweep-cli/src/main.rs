use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use iocsweep_core::{
    sha256_file, write_json_report, ProgressMode, ResultSink, RuleEngine, Sweep, SweepOptions, SweepOutcome,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

mod config;

use config::Config;

/// 命令行入口（基于 clap）
#[derive(Parser, Debug)]
#[command(name = "iocsweep", version, about = "Host IOC sweep: known-bad hashes, suspicious extensions, signature rules")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 按配置扫描目录树
    Scan {
        /// 配置文件（TOML）
        #[arg(long, default_value = "config.toml")]
        config: PathBuf,

        /// 覆盖配置中的扫描根目录
        #[arg(long)]
        scan_dir: Option<PathBuf>,

        /// 线程数（默认 CPU 核数，最少 2）
        #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
        workers: Option<usize>,

        /// 签名规则文件（TOML）
        #[arg(long)]
        rules: Option<PathBuf>,

        /// 额外写出 JSON 报告
        #[arg(long)]
        report: Option<PathBuf>,

        /// 调试模式：错误行同时打印到 stderr
        #[arg(long)]
        debug: bool,

        /// 不绘制进度条
        #[arg(long)]
        no_progress: bool,
    },
    /// 校验并打印配置
    Config {
        #[arg(long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// 计算文件的 SHA-256（用于整理 IOC 列表）
    Hash {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { config, scan_dir, workers, rules, report, debug, no_progress } => {
            let mut cfg = Config::load(&config)?;
            // 命令行参数优先于配置文件
            if let Some(dir) = scan_dir { cfg.scan_dir = dir; }
            if workers.is_some() { cfg.workers = workers; }
            if rules.is_some() { cfg.rules_file = rules; }
            if report.is_some() { cfg.report_file = report; }
            cfg.debug |= debug;

            init_tracing(cfg.debug);
            let progress = if no_progress { ProgressMode::Hidden } else { ProgressMode::Terminal };
            run_scan(&cfg, progress)
        }
        Commands::Config { config } => {
            init_tracing(false);
            let cfg = Config::load(&config)?;
            print!("{cfg}");
            Ok(())
        }
        Commands::Hash { files } => {
            for f in files {
                let digest = sha256_file(&f).with_context(|| format!("hash {}", f.display()))?;
                println!("{digest}  {}", f.display());
            }
            Ok(())
        }
    }
}

fn run_scan(cfg: &Config, progress: ProgressMode) -> Result<()> {
    info!(scan_dir = ?cfg.scan_dir, ioc_file = ?cfg.ioc_file, "starting sweep");
    if cfg.prune_paths.is_empty() {
        warn!("prune_paths not set");
    }

    // 两个日志文件在扫描前清空
    let sink = ResultSink::files(&cfg.output_file, &cfg.error_file)
        .context("create output/error log files")?
        .mirror_errors(cfg.debug);

    let mut opts = SweepOptions::new(&cfg.scan_dir, &cfg.ioc_file);
    opts.exclusions = cfg.prune_paths.clone();
    opts.workers = cfg.workers;
    opts.suspicious_extension = cfg.suspicious_extension.clone();
    opts.progress = progress;

    let mut sweep = Sweep::new(opts, sink);
    if let Some(rules) = &cfg.rules_file {
        let engine = RuleEngine::load(rules)?;
        info!(rules = engine.len(), "signature rules loaded");
        sweep = sweep.with_signatures(Arc::new(engine));
    }

    let report = sweep.run()?;
    if let Some(path) = &cfg.report_file {
        write_json_report(&report, path)?;
    }

    if report.outcome == SweepOutcome::NothingToScan {
        println!("No files to scan.");
    }
    println!(
        "\nAnalysis done. Please refer to {} and {} for more details.",
        cfg.output_file.display(),
        cfg.error_file.display()
    );
    if report.has_findings() {
        println!("IOCs have been found on this target -> see {}", cfg.output_file.display());
    } else {
        println!("No IOC found.");
    }
    Ok(())
}

fn init_tracing(debug: bool) {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    // 支持通过环境变量 RUST_LOG 控制日志等级；debug 模式默认 debug 级别
    let default = if debug { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let subscriber = FmtSubscriber::builder().with_env_filter(env_filter).with_writer(std::io::stderr).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
