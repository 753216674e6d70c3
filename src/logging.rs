//! 日志初始化和配置模块
//!
//! 这个模块提供了统一的日志初始化功能，使用 tracing 库。
//! 默认配置：info 级别，输出到控制台和 logs 目录（按天滚动）。
//! 环境变量 `RUST_LOG` 优先于配置的级别。

use std::io;
use std::path::PathBuf;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, time::SystemTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::LogSection;

/// 日志配置结构体
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志级别
    pub level: Level,
    /// 日志文件目录
    pub log_dir: PathBuf,
    /// 是否输出到控制台
    pub enable_stdout: bool,
}

impl LogConfig {
    /// 创建新的日志配置，使用默认级别
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置日志级别
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// 设置日志目录
    pub fn log_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// 从配置文件的 `[log]` 段构造
    ///
    /// 级别字符串已由 `Config::validate` 校验，无法识别时回落到 INFO。
    pub fn from_section(section: &LogSection) -> Self {
        let level = section.level.parse().unwrap_or(Level::INFO);
        Self {
            level,
            log_dir: PathBuf::from(&section.log_dir),
            enable_stdout: section.enable_stdout,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            log_dir: PathBuf::from("logs"),
            enable_stdout: true,
        }
    }
}

static INIT_LOGGER: Once = Once::new();

/// 日志初始化错误
///
/// 全局 subscriber 已存在时不算错误，唯一的失败来源是日志目录无法创建。
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("IO错误: {0}")]
    Io(#[from] io::Error),
}

/// 日志初始化结果
pub type LogResult<T> = Result<T, LogError>;

/// 初始化日志系统
///
/// - 控制台输出（可关闭）
/// - `log_dir` 目录下按天滚动的日志文件 `sqllog-summary.YYYY-MM-DD`
/// - 重复调用不会报错，只有第一次生效
///
/// # Examples
///
/// ```no_run
/// use sqllog_summary::logging::{init_logging, LogConfig};
/// use tracing::Level;
///
/// let config = LogConfig::new().level(Level::DEBUG);
/// init_logging(config).unwrap();
/// ```
pub fn init_logging(config: LogConfig) -> LogResult<()> {
    std::fs::create_dir_all(&config.log_dir)?;

    INIT_LOGGER.call_once(|| install_subscriber(&config));
    Ok(())
}

fn install_subscriber(config: &LogConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));

    let console_layer = config.enable_stdout.then(|| {
        fmt::layer()
            .with_writer(io::stderr)
            .with_timer(SystemTime)
            .with_target(true)
            .with_ansi(true)
    });

    let file_appender =
        tracing_appender::rolling::daily(&config.log_dir, "sqllog-summary");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_timer(SystemTime)
        .with_target(true)
        .with_ansi(false); // 文件中不使用颜色

    // 其他地方（例如测试）已经安装了全局 subscriber 时 try_init 失败，沿用已有的
    if Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_ok()
    {
        // guard 被丢弃后后台写线程会退出，进程内保持存活
        std::mem::forget(guard);
        tracing::info!(
            "日志系统初始化完成 - 级别 {}, 目录 {}",
            config.level,
            config.log_dir.display()
        );
    }
}
