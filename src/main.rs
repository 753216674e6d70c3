use anyhow::{Context, Result};
use clap::Parser;
use clap::error::ErrorKind;
use sqllog_summary::Config;
use sqllog_summary::config::MAX_CHUNK_SIZE_MB;
use sqllog_summary::sqllog::{Granularity, LogDialect};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sqllog-summary")]
#[command(version)]
#[command(about = "重组 PostgreSQL 语句日志，按操作类型和时间汇总语句形状")]
struct Cli {
    /// 输入日志文件
    input: PathBuf,

    /// 分块读取的块大小（MB，可为小数），0 表示按行读取
    #[arg(value_parser = parse_chunk_mb)]
    chunk_mb: Option<f64>,

    /// 汇总粒度: daily 或 minute
    #[arg(long)]
    granularity: Option<Granularity>,

    /// 日志方言: statement 或 generic
    #[arg(long)]
    dialect: Option<LogDialect>,

    /// TOML 配置文件
    #[arg(long)]
    config: Option<PathBuf>,

    /// 桶文件、汇总文件和归档的输出目录
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// 不打包归档（同时保留临时文件）
    #[arg(long)]
    no_archive: bool,

    /// 归档后保留桶文件和汇总文件
    #[arg(long)]
    keep_scratch: bool,

    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

fn parse_chunk_mb(s: &str) -> std::result::Result<f64, String> {
    let mb: f64 = s.parse().map_err(|_| format!("无效的块大小: {s}"))?;
    if !mb.is_finite() || mb < 0.0 {
        return Err(format!("块大小必须是非负数: {s}"));
    }
    if mb > MAX_CHUNK_SIZE_MB {
        return Err(format!("块大小不能超过 {MAX_CHUNK_SIZE_MB} MB: {s}"));
    }
    Ok(mb)
}

impl Cli {
    /// 命令行参数覆盖配置文件中的值
    fn apply(&self, config: &mut Config) {
        if let Some(mb) = self.chunk_mb {
            config.digest.chunk_size_mb = mb;
        }
        if let Some(granularity) = self.granularity {
            config.digest.granularity = granularity;
        }
        if let Some(dialect) = self.dialect {
            config.digest.dialect = dialect;
        }
        if let Some(dir) = &self.work_dir {
            config.digest.work_dir = dir.to_string_lossy().into_owned();
        }
        if self.no_archive {
            config.archive.enabled = false;
        }
        if self.keep_scratch {
            config.archive.cleanup = false;
        }
        if let Some(level) = &self.log_level {
            config.log.level = level.clone();
        }
    }
}

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("加载配置文件失败: {}", path.display()))?,
        None => Config::default(),
    };
    cli.apply(&mut config);
    config.validate()?;

    #[cfg(feature = "logging")]
    sqllog_summary::logging::init_logging(
        sqllog_summary::logging::LogConfig::from_section(&config.log),
    )?;

    let report = sqllog_summary::run(&config, &cli.input)
        .with_context(|| format!("处理失败: {}", cli.input.display()))?;
    println!("{report}");
    Ok(())
}
