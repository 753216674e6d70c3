//! 汇总阶段
//!
//! 读取本次运行写出的桶文件，按 (桶标签, 归一化语句) 计数，
//! 结果按标签、语句文本的字典序写入汇总文件（整体重写）。
//!
//! 桶文件始终按日期划分；分钟粒度下，标签从每行保存的时间戳重新推导，
//! 推导失败的行不计入汇总。

use crate::error::Result;
use crate::sqllog::normalizer::Normalizer;
use crate::sqllog::types::{
    Granularity, OperationKind, SkipReason, SkippedLine, SummaryEntry, store_file_name,
};
use crate::sqllog::utils::bucket_label;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// 桶文件中时间戳与正文之间的分隔符
const FIELD_SEPARATOR: &str = " | ";

/// 日粒度汇总文件名
pub const DAILY_SUMMARY_FILE: &str = "daily_summary.log";

/// 按粒度得到汇总文件名，分钟粒度带上输入文件名（不含扩展名）
pub fn summary_file_name(granularity: Granularity, input_stem: &str) -> String {
    match granularity {
        Granularity::Daily => DAILY_SUMMARY_FILE.to_string(),
        Granularity::Minute => format!("summary_minute_{input_stem}.log"),
    }
}

/// 桶文件中被跳过的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSkip {
    pub store: PathBuf,
    pub line: SkippedLine,
}

/// 汇总结果
#[derive(Debug, Clone, Default)]
pub struct SummaryStore {
    /// 汇总文件路径
    pub path: PathBuf,
    /// 已排序的汇总条目
    pub entries: Vec<SummaryEntry>,
    /// 读取的桶文件数
    pub stores_read: usize,
    /// 被跳过的桶文件行
    pub skipped: Vec<StoreSkip>,
}

impl SummaryStore {
    /// 所有条目计数之和
    pub fn total_count(&self) -> u64 {
        self.entries.iter().map(|e| e.count).sum()
    }
}

/// 汇总器，与分桶阶段共用同一个归一化缓存
pub struct Aggregator<'a> {
    work_dir: PathBuf,
    granularity: Granularity,
    summary_path: PathBuf,
    normalizer: &'a mut Normalizer,
    /// 设置后只读取这些桶文件，其余同名文件视为过期的临时文件
    written: Option<BTreeSet<PathBuf>>,
}

impl<'a> Aggregator<'a> {
    pub fn new<P: AsRef<Path>, S: AsRef<Path>>(
        work_dir: P,
        granularity: Granularity,
        summary_path: S,
        normalizer: &'a mut Normalizer,
    ) -> Self {
        Self {
            work_dir: work_dir.as_ref().to_path_buf(),
            granularity,
            summary_path: summary_path.as_ref().to_path_buf(),
            normalizer,
            written: None,
        }
    }

    /// 只汇总本次运行写出的桶文件
    pub fn restrict_to<I>(mut self, stores: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.written = Some(stores.into_iter().collect());
        self
    }

    /// 对所有已见到的日期标签做汇总，并重写汇总文件
    pub fn aggregate(&mut self, observed: &BTreeSet<String>) -> Result<SummaryStore> {
        let mut counts: BTreeMap<(String, String), u64> = BTreeMap::new();
        let mut skipped = Vec::new();
        let mut stores_read = 0;

        for day in observed {
            for kind in OperationKind::ALL {
                let path = self.work_dir.join(store_file_name(kind, day));
                if !path.exists() {
                    continue;
                }
                if let Some(written) = &self.written {
                    if !written.contains(&path) {
                        tracing::debug!("忽略过期桶文件 {}", path.display());
                        continue;
                    }
                }
                stores_read += 1;
                self.count_store(&path, &mut counts, &mut skipped)?;
            }
        }

        let entries: Vec<SummaryEntry> = counts
            .into_iter()
            .map(|((bucket_label, normalized_statement), count)| SummaryEntry {
                bucket_label,
                normalized_statement,
                count,
            })
            .collect();

        self.write_summary(&entries)?;
        tracing::info!(
            "汇总完成: 读取 {} 个桶文件, {} 条汇总, 跳过 {} 行 -> {}",
            stores_read,
            entries.len(),
            skipped.len(),
            self.summary_path.display()
        );

        Ok(SummaryStore {
            path: self.summary_path.clone(),
            entries,
            stores_read,
            skipped,
        })
    }

    fn count_store(
        &mut self,
        path: &Path,
        counts: &mut BTreeMap<(String, String), u64>,
        skipped: &mut Vec<StoreSkip>,
    ) -> Result<()> {
        tracing::debug!("读取桶文件 {}", path.display());
        let reader = BufReader::new(File::open(path)?);

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let mut skip = |reason: SkipReason, raw: &str| {
                tracing::warn!("{} 第 {} 行: {}", path.display(), idx + 1, reason);
                skipped.push(StoreSkip {
                    store: path.to_path_buf(),
                    line: SkippedLine { line: idx + 1, reason, raw: raw.to_string() },
                });
            };

            let Some((timestamp, body)) = line.split_once(FIELD_SEPARATOR) else {
                skip(SkipReason::Malformed, &line);
                continue;
            };
            let Some(label) = bucket_label(timestamp, self.granularity) else {
                skip(SkipReason::BadTimestamp, &line);
                continue;
            };

            let normalized = self.normalizer.normalize(body.trim()).to_string();
            *counts.entry((label, normalized)).or_insert(0) += 1;
        }
        Ok(())
    }

    fn write_summary(&self, entries: &[SummaryEntry]) -> Result<()> {
        let mut out = BufWriter::new(File::create(&self.summary_path)?);
        for entry in entries {
            out.write_all(entry.to_line().as_bytes())?;
        }
        out.flush()?;
        Ok(())
    }
}
