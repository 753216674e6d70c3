//! 跳过行报告 - JSONL 格式
//!
//! 每个被跳过的输入行或桶文件行写成一个 JSON 对象：
//!
//! ```json
//! {"path":"pg.log","line":3,"reason":"orphan","raw":"  stray text"}
//! ```
//!
//! 报告文件在每次运行开始时重建。

use crate::error::Result;
use crate::sqllog::types::{SkipReason, SkippedLine};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct SkippedRecord<'a> {
    path: &'a str,
    line: usize,
    reason: SkipReason,
    raw: &'a str,
}

/// 跳过行写入器
pub struct SkippedWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    written: usize,
}

impl SkippedWriter {
    /// 创建报告文件，必要时创建父目录
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        Ok(Self { writer: BufWriter::new(file), path, written: 0 })
    }

    /// 写入一批跳过行
    ///
    /// 序列化或写入失败只记录日志，不中断处理。
    pub fn write_skipped<P: AsRef<Path>>(&mut self, source: P, lines: &[SkippedLine]) {
        if lines.is_empty() {
            return;
        }

        let source = source.as_ref().to_string_lossy();
        for skipped in lines {
            let record = SkippedRecord {
                path: &source,
                line: skipped.line,
                reason: skipped.reason,
                raw: &skipped.raw,
            };
            match serde_json::to_string(&record) {
                Ok(json) => {
                    if let Err(e) = writeln!(self.writer, "{json}") {
                        tracing::error!("写入跳过行报告失败 {}: {}", self.path.display(), e);
                        continue;
                    }
                    self.written += 1;
                }
                Err(e) => tracing::error!("序列化跳过行失败: {e}"),
            }
        }
    }

    /// 刷新缓冲区
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// 已写入的条数
    pub fn written(&self) -> usize {
        self.written
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SkippedWriter {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            tracing::error!("刷新跳过行报告失败 {}: {}", self.path.display(), e);
        }
    }
}
