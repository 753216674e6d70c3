//! 分桶写入器
//!
//! 每条语句按 (操作类型, 日期) 落到一个桶文件 `<KIND>_<日期>.log`，
//! 行格式为 `<时间戳> | <正文>`。写入先进入每个桶自己的缓冲区，
//! 缓冲区达到阈值时追加写盘。
//!
//! 桶文件在本次运行中第一次用到时以截断方式打开：上一次中断运行留下的
//! 同名文件属于过期的临时文件，不会被并入本次结果。
//!
//! 正常结束时调用 [`BucketWriter::finish`]，它会写出所有缓冲并关闭文件，
//! 写盘错误会返回给调用方。若没有走到 `finish`（读取输入失败、panic），
//! `Drop` 会做同样的写盘和关闭，错误只记录日志。

use crate::bucket::stats::RouteStats;
use crate::error::Result;
use crate::sqllog::types::{BucketKey, OperationKind, StatementRecord};
use crate::sqllog::utils::day_label;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// 默认的缓冲阈值（行）
pub const DEFAULT_FLUSH_THRESHOLD: usize = 1000;

/// 单个桶文件及其待写缓冲
struct Store {
    path: PathBuf,
    writer: BufWriter<File>,
    pending: Vec<String>,
}

impl Store {
    fn open(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        Ok(Self { path, writer: BufWriter::new(file), pending: Vec::new() })
    }

    /// 追加写出缓冲区中的行并清空缓冲区，返回写出的行数
    fn flush(&mut self) -> std::io::Result<usize> {
        let n = self.pending.len();
        for line in self.pending.drain(..) {
            self.writer.write_all(line.as_bytes())?;
        }
        self.writer.flush()?;
        Ok(n)
    }
}

/// 分桶写入完成后的结果
#[derive(Debug, Clone, Default)]
pub struct WrittenStores {
    /// 本次运行见到的所有日期标签
    pub observed_days: BTreeSet<String>,
    /// 本次运行打开过的桶文件，按打开顺序排列
    pub store_paths: Vec<PathBuf>,
    /// 写入统计
    pub stats: RouteStats,
}

/// 带阈值缓冲的分桶写入器
pub struct BucketWriter {
    dir: PathBuf,
    flush_threshold: usize,
    stores: BTreeMap<BucketKey, Store>,
    observed_days: BTreeSet<String>,
    opened: Vec<PathBuf>,
    stats: RouteStats,
}

impl BucketWriter {
    /// 在 `dir` 目录下写入桶文件，`flush_threshold` 为 0 时按 1 处理
    pub fn new<P: AsRef<Path>>(dir: P, flush_threshold: usize) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            flush_threshold: flush_threshold.max(1),
            stores: BTreeMap::new(),
            observed_days: BTreeSet::new(),
            opened: Vec::new(),
            stats: RouteStats::new(),
        }
    }

    /// 把一条定稿的语句写入对应的桶
    ///
    /// 时间戳为空的记录无法得到日期标签，直接丢弃。
    pub fn route(&mut self, record: StatementRecord) -> Result<()> {
        let Some(day) = day_label(&record.timestamp) else {
            tracing::warn!(body = %record.body, "记录缺少时间戳，丢弃");
            self.stats.dropped_records += 1;
            return Ok(());
        };

        let kind = OperationKind::classify(&record.body);
        let key = BucketKey::new(kind, day);
        if !self.observed_days.contains(&key.day) {
            self.observed_days.insert(key.day.clone());
        }

        let store = match self.stores.entry(key) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                let path = self.dir.join(e.key().file_name());
                tracing::debug!("打开桶文件 {}", path.display());
                let store = Store::open(path.clone())?;
                self.opened.push(path);
                e.insert(store)
            }
        };

        store.pending.push(format!("{} | {}\n", record.timestamp, record.body));
        self.stats.record(kind);

        if store.pending.len() >= self.flush_threshold {
            let n = store.flush()?;
            self.stats.flushed_lines += n;
            self.stats.flushes += 1;
            tracing::trace!("桶 {} 写盘 {} 行", store.path.display(), n);
        }
        Ok(())
    }

    /// 已见到的日期标签
    pub fn observed_days(&self) -> &BTreeSet<String> {
        &self.observed_days
    }

    /// 当前统计信息
    pub fn stats(&self) -> &RouteStats {
        &self.stats
    }

    /// 写出所有缓冲并关闭每个桶文件
    ///
    /// 即使某个桶写盘失败，其余桶也会继续写出并关闭，最后返回第一个错误。
    pub fn finish(mut self) -> Result<WrittenStores> {
        let first_err = self.close_all();
        self.stats.finish();
        tracing::info!("分桶写入完成: {}", self.stats);

        let written = WrittenStores {
            observed_days: std::mem::take(&mut self.observed_days),
            store_paths: std::mem::take(&mut self.opened),
            stats: self.stats.clone(),
        };
        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(written),
        }
    }

    /// 写出并关闭全部桶文件，每个文件只关闭一次
    fn close_all(&mut self) -> Option<std::io::Error> {
        let mut first_err = None;
        for (key, mut store) in std::mem::take(&mut self.stores) {
            match store.flush() {
                Ok(n) => {
                    if n > 0 {
                        self.stats.flushed_lines += n;
                        self.stats.flushes += 1;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        "桶 {} 写盘失败: {}",
                        store.path.display(),
                        e
                    );
                    first_err.get_or_insert(e);
                }
            }
            tracing::trace!("关闭桶文件 {}", key.file_name());
            // store 在这里被丢弃，文件句柄随之关闭
        }
        first_err
    }
}

impl Drop for BucketWriter {
    fn drop(&mut self) {
        if self.stores.is_empty() {
            return;
        }
        tracing::warn!(
            "分桶写入器未正常结束，写出剩余 {} 行缓冲",
            self.stats.pending_lines()
        );
        if let Some(e) = self.close_all() {
            tracing::error!("清理桶文件时写盘失败: {e}");
        }
    }
}
