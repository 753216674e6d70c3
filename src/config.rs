//! 配置管理模块
//!
//! 提供统一的配置文件读取和管理功能。命令行参数在 `main.rs` 中覆盖这里的值。

use crate::error::{Result, SummaryError};
use crate::sqllog::types::{Granularity, LogDialect, ReadMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 分块读取允许的最大块大小（MB）
pub const MAX_CHUNK_SIZE_MB: f64 = 1024.0;

/// 主配置结构体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 日志配置
    #[serde(default)]
    pub log: LogSection,
    /// 解析与汇总配置
    #[serde(default)]
    pub digest: DigestSection,
    /// 归档配置
    #[serde(default)]
    pub archive: ArchiveSection,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// 是否启用控制台输出
    pub enable_stdout: bool,
    /// 日志输出目录
    pub log_dir: String,
    /// 日志级别 (trace, debug, info, warn, error)
    pub level: String,
}

/// 解析与汇总配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestSection {
    /// 汇总粒度：按天或按分钟
    pub granularity: Granularity,
    /// 日志方言（语句标记的识别方式）
    pub dialect: LogDialect,
    /// 分块读取的块大小（MB），0 表示按行读取
    pub chunk_size_mb: f64,
    /// 每个桶文件缓冲多少行后写盘
    pub flush_threshold: usize,
    /// 桶文件、汇总文件和归档的输出目录
    pub work_dir: String,
    /// 是否写出跳过行报告
    pub write_skipped: bool,
    /// 跳过行报告路径（JSONL），相对路径相对于 `work_dir`
    pub skipped_out_path: String,
}

/// 归档配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveSection {
    /// 是否打包 tar.gz
    pub enabled: bool,
    /// 打包成功后是否删除桶文件和汇总文件
    pub cleanup: bool,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            enable_stdout: true,
            log_dir: "logs".to_string(),
            level: "info".to_string(),
        }
    }
}

impl Default for DigestSection {
    fn default() -> Self {
        Self {
            granularity: Granularity::Daily,
            dialect: LogDialect::Statement,
            chunk_size_mb: 1.0,
            flush_threshold: 1000,
            work_dir: ".".to_string(),
            write_skipped: false,
            skipped_out_path: "skipped_lines.jsonl".to_string(),
        }
    }
}

impl Default for ArchiveSection {
    fn default() -> Self {
        Self { enabled: true, cleanup: true }
    }
}

impl DigestSection {
    /// 把 `chunk_size_mb` 换算为读取模式，超过上限的块大小按上限处理
    pub fn read_mode(&self) -> ReadMode {
        if self.chunk_size_mb.is_nan() || self.chunk_size_mb <= 0.0 {
            ReadMode::Lines
        } else {
            let mb = self.chunk_size_mb.min(MAX_CHUNK_SIZE_MB);
            let bytes = (mb * 1024.0 * 1024.0) as usize;
            ReadMode::Chunked { chunk_bytes: bytes.max(1) }
        }
    }

    /// 输出目录
    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir)
    }

    /// 跳过行报告的实际路径
    pub fn skipped_out_path(&self) -> PathBuf {
        let path = Path::new(&self.skipped_out_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.work_dir().join(path)
        }
    }
}

impl Config {
    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// 从字符串加载配置
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        match self.log.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(SummaryError::config(format!(
                    "无效的日志级别: {}",
                    self.log.level
                )));
            }
        }

        if self.digest.flush_threshold == 0 {
            return Err(SummaryError::config("flush_threshold 不能为0"));
        }

        if !self.digest.chunk_size_mb.is_finite()
            || self.digest.chunk_size_mb < 0.0
            || self.digest.chunk_size_mb > MAX_CHUNK_SIZE_MB
        {
            return Err(SummaryError::config(format!(
                "无效的分块大小: {} MB（允许 0 到 {} MB）",
                self.digest.chunk_size_mb, MAX_CHUNK_SIZE_MB
            )));
        }

        if self.digest.work_dir.trim().is_empty() {
            return Err(SummaryError::config("work_dir 不能为空"));
        }

        if self.digest.write_skipped
            && self.digest.skipped_out_path.trim().is_empty()
        {
            return Err(SummaryError::config(
                "启用 write_skipped 时 skipped_out_path 不能为空",
            ));
        }

        if self.archive.cleanup && !self.archive.enabled {
            tracing::warn!("archive.cleanup 仅在 archive.enabled 时生效");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.log.level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.log.level = "info".to_string();
        config.digest.flush_threshold = 0;
        assert!(config.validate().is_err());

        config.digest.flush_threshold = 10;
        config.digest.chunk_size_mb = -1.0;
        assert!(config.validate().is_err());

        config.digest.chunk_size_mb = 1e15;
        assert!(config.validate().is_err());

        config.digest.chunk_size_mb = MAX_CHUNK_SIZE_MB * 2.0;
        assert!(config.validate().is_err());

        config.digest.chunk_size_mb = MAX_CHUNK_SIZE_MB;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed_config: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.log.level, parsed_config.log.level);
        assert_eq!(
            config.digest.granularity,
            parsed_config.digest.granularity
        );
    }

    #[test]
    fn test_read_mode() {
        let mut digest = DigestSection::default();
        assert_eq!(
            digest.read_mode(),
            ReadMode::Chunked { chunk_bytes: 1024 * 1024 }
        );

        digest.chunk_size_mb = 0.0;
        assert_eq!(digest.read_mode(), ReadMode::Lines);

        digest.chunk_size_mb = 0.5;
        assert_eq!(
            digest.read_mode(),
            ReadMode::Chunked { chunk_bytes: 512 * 1024 }
        );

        digest.chunk_size_mb = 1e15;
        assert_eq!(
            digest.read_mode(),
            ReadMode::Chunked { chunk_bytes: 1024 * 1024 * 1024 }
        );
    }

    #[test]
    fn test_skipped_out_path_relative_to_work_dir() {
        let mut digest = DigestSection::default();
        digest.work_dir = "out".to_string();
        assert_eq!(
            digest.skipped_out_path(),
            Path::new("out").join("skipped_lines.jsonl")
        );

        let absolute = std::env::temp_dir().join("skipped.jsonl");
        digest.skipped_out_path = absolute.to_string_lossy().into_owned();
        assert_eq!(digest.skipped_out_path(), absolute);
    }
}
