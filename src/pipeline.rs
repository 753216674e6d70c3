//! 单次运行的完整流程
//!
//! ```text
//! 输入文件 → 行读取 → 语句重组 → 归一化(预热缓存) → 分桶写入
//!                                                    ↓
//!                      归档/清理 ← 汇总文件 ← 按标签汇总
//! ```
//!
//! 全程单线程顺序执行：一遍完成重组和分桶，一遍完成汇总。
//! 读取输入失败时先保证桶文件写盘关闭，再返回错误，不进入汇总阶段；
//! 失败前未完成的语句被丢弃。归档失败不影响本次结果，临时文件原样保留。

use crate::aggregate::{Aggregator, SummaryStore, summary_file_name};
use crate::archive::{self, ArchivePlan};
use crate::bucket::{BucketWriter, WrittenStores};
use crate::config::Config;
use crate::error::{Result, SummaryError};
use crate::skipped_writer::SkippedWriter;
use crate::sqllog::io::open_lines;
use crate::sqllog::{Normalizer, StatementAssembler, StatementRecord};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// 一次运行的结果
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub input: PathBuf,
    /// 读取的物理行数
    pub lines_read: usize,
    /// 分桶阶段的结果
    pub stores: WrittenStores,
    /// 汇总结果
    pub summary: SummaryStore,
    /// 输入中被跳过的行数
    pub skipped_lines: usize,
    /// 跳过行报告路径（启用时）
    pub skipped_report: Option<PathBuf>,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// 归档路径（生成时）
    pub archive: Option<PathBuf>,
    /// 打包归档失败的原因
    pub archive_error: Option<String>,
    /// 清理时删除失败的文件数
    pub cleanup_failures: usize,
    pub elapsed: Duration,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "输入文件: {}", self.input.display())?;
        writeln!(
            f,
            "读取 {} 行, 重组 {} 条语句, 跳过 {} 行",
            self.lines_read, self.stores.stats.routed_records, self.skipped_lines
        )?;
        writeln!(
            f,
            "桶文件 {} 个, 汇总条目 {} 条 -> {}",
            self.stores.store_paths.len(),
            self.summary.entries.len(),
            self.summary.path.display()
        )?;
        writeln!(
            f,
            "归一化缓存: 命中 {}, 未命中 {}",
            self.cache_hits, self.cache_misses
        )?;
        if let Some(report) = &self.skipped_report {
            writeln!(f, "跳过行报告: {}", report.display())?;
        }
        if let Some(archive) = &self.archive {
            writeln!(f, "归档: {}", archive.display())?;
        }
        if let Some(e) = &self.archive_error {
            writeln!(f, "归档失败（已保留临时文件）: {e}")?;
        }
        if self.cleanup_failures > 0 {
            writeln!(f, "清理失败 {} 个文件", self.cleanup_failures)?;
        }
        write!(f, "耗时: {:.2?}", self.elapsed)
    }
}

/// 输入文件名（不含扩展名），用于汇总文件名和归档名
pub fn input_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "sqllog".to_string())
}

/// 处理一个输入文件
pub fn run(config: &Config, input: &Path) -> Result<RunReport> {
    if !input.is_file() {
        return Err(SummaryError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("输入文件不存在: {}", input.display()),
        )));
    }
    let lines = open_lines(input, config.digest.read_mode())?;
    run_lines(config, input, lines)
}

/// 处理一个已经打开的行序列
///
/// `input` 只用于命名汇总文件、归档和跳过行报告中的来源路径。
pub fn run_lines<I>(config: &Config, input: &Path, lines: I) -> Result<RunReport>
where
    I: Iterator<Item = Result<String>>,
{
    let start = Instant::now();
    let digest = &config.digest;
    let work_dir = digest.work_dir();
    let stem = input_stem(input);

    std::fs::create_dir_all(&work_dir)?;

    tracing::info!(
        "开始处理 {}, 粒度 {:?}, 方言 {:?}, 读取方式 {:?}",
        input.display(),
        digest.granularity,
        digest.dialect,
        digest.read_mode()
    );

    let mut normalizer = Normalizer::new();
    let mut skipped_writer = if digest.write_skipped {
        Some(SkippedWriter::new(digest.skipped_out_path())?)
    } else {
        None
    };

    // 第一遍：重组 + 分桶
    let mut assembler =
        StatementAssembler::new(digest.dialect).collect_skipped(skipped_writer.is_some());
    let mut writer = BucketWriter::new(&work_dir, digest.flush_threshold);
    let mut failure = None;

    for line in lines {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                failure = Some(e);
                break;
            }
        };

        let finished = assembler.push_line(&line);
        if let Some(w) = skipped_writer.as_mut() {
            w.write_skipped(input, &assembler.take_skipped());
        }

        let Some(record) = finished else {
            continue;
        };
        if let Err(e) = route_record(&mut writer, &mut normalizer, record) {
            failure = Some(e);
            break;
        }
    }

    if failure.is_none() {
        failure = assembler
            .finish()
            .and_then(|record| route_record(&mut writer, &mut normalizer, record).err());
    } else if assembler.is_accumulating() {
        tracing::warn!("处理中断，丢弃未完成的语句");
    }
    let skipped_lines = assembler.skipped_count();
    let lines_read = assembler.line_count();

    let finished = writer.finish();
    if let Some(e) = failure {
        if let Err(flush_err) = &finished {
            tracing::error!("桶文件写盘失败: {flush_err}");
        }
        tracing::error!("处理 {} 失败: {}", input.display(), e);
        return Err(e);
    }
    let stores = finished?;

    // 第二遍：汇总
    let summary_path = work_dir.join(summary_file_name(digest.granularity, &stem));
    let summary = Aggregator::new(&work_dir, digest.granularity, &summary_path, &mut normalizer)
        .restrict_to(stores.store_paths.iter().cloned())
        .aggregate(&stores.observed_days)?;

    let mut skipped_report = None;
    if let Some(mut w) = skipped_writer {
        for skip in &summary.skipped {
            w.write_skipped(&skip.store, std::slice::from_ref(&skip.line));
        }
        w.flush()?;
        tracing::info!("跳过行报告写入 {} 条 -> {}", w.written(), w.path().display());
        skipped_report = Some(w.path().to_path_buf());
    }

    // 归档与清理
    let mut archive_path = None;
    let mut archive_error = None;
    let mut cleanup_failures = 0;
    if config.archive.enabled {
        let mut members = vec![summary.path.clone()];
        members.extend(stores.store_paths.iter().cloned());

        let plan = ArchivePlan {
            work_dir: work_dir.clone(),
            input_stem: stem,
            granularity: digest.granularity,
            members,
        };
        match archive::package(&plan) {
            Ok(path) => archive_path = path,
            Err(e) => {
                tracing::error!("打包归档失败，保留临时文件: {e}");
                archive_error = Some(e.to_string());
            }
        }
        if archive_path.is_some() && config.archive.cleanup {
            cleanup_failures = archive::cleanup(&plan.members);
            if cleanup_failures > 0 {
                tracing::warn!("{} 个临时文件删除失败", cleanup_failures);
            }
        }
    }

    let report = RunReport {
        input: input.to_path_buf(),
        lines_read,
        stores,
        summary,
        skipped_lines,
        skipped_report,
        cache_hits: normalizer.hits(),
        cache_misses: normalizer.misses(),
        archive: archive_path,
        archive_error,
        cleanup_failures,
        elapsed: start.elapsed(),
    };
    tracing::info!("处理完成, 耗时 {:.2?}", report.elapsed);
    Ok(report)
}

/// 归一化（预热缓存）后写入对应的桶
fn route_record(
    writer: &mut BucketWriter,
    normalizer: &mut Normalizer,
    record: StatementRecord,
) -> Result<()> {
    let shape = normalizer.normalize(&record.body);
    tracing::trace!(timestamp = %record.timestamp, shape, "语句");
    writer.route(record)
}
