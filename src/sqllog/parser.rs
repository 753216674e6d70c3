//! 语句重组器 - 多行拼接状态机
//!
//! 数据库日志中一条 SQL 语句可能跨越多个物理行：首行以时间戳开头并带有
//! 语句标记，之后的续行没有时间戳。本模块把这些行重新拼成完整的
//! [`StatementRecord`]。
//!
//! ## 状态机
//!
//! ```text
//!            时间戳 + 标记                 时间戳 + 标记
//!   Idle ────────────────▶ Accumulating ─────────────────▶ (产出记录) Accumulating
//!    ▲                        │    ▲  │
//!    │   时间戳但无标记        │    └──┘ 其他非空行：以空格追加
//!    └────────────────────────┘ (产出记录)
//! ```
//!
//! - 空行永远跳过，不改变状态
//! - `Idle` 下的非时间戳行被丢弃（记为跳过行）
//! - 输入结束时若处于 `Accumulating`，产出最后一条记录
//! - 产出的正文去掉末尾分号
//!
//! ## 拼接示例
//!
//! ```text
//! 2024-01-01 10:00:01 LOG:  statement: SELECT *
//!     FROM users
//!     WHERE id = 5;
//! ```
//!
//! 结果：`SELECT * FROM users WHERE id = 5`

use crate::error::Result;
use crate::sqllog::types::{LogDialect, SkipReason, SkippedLine, StatementRecord};
use crate::sqllog::utils::timestamp_prefix_len;

const STATEMENT_MARKER: &str = "statement: ";

/// 重组器状态
#[derive(Debug, Default)]
enum AssemblerState {
    #[default]
    Idle,
    Accumulating(StatementRecord),
}

/// 首行的识别结果
#[derive(Debug, PartialEq, Eq)]
enum LineHead<'a> {
    /// 时间戳 + 语句标记
    Statement { timestamp: &'a str, body: &'a str },
    /// 有时间戳但没有可识别的标记
    TimestampOnly,
    /// 不以时间戳开头
    Continuation,
}

/// 逐行驱动的语句重组器
///
/// 跳过行默认只计数；调用 [`collect_skipped`](Self::collect_skipped) 后
/// 才保留明细，调用方需要在每次 `push_line` 之后用 `take_skipped` 取走。
#[derive(Debug)]
pub struct StatementAssembler {
    dialect: LogDialect,
    state: AssemblerState,
    line_num: usize,
    collect: bool,
    skipped_count: usize,
    skipped: Vec<SkippedLine>,
}

impl StatementAssembler {
    pub fn new(dialect: LogDialect) -> Self {
        Self {
            dialect,
            state: AssemblerState::Idle,
            line_num: 0,
            collect: false,
            skipped_count: 0,
            skipped: Vec::new(),
        }
    }

    /// 是否保留跳过行明细
    pub fn collect_skipped(mut self, collect: bool) -> Self {
        self.collect = collect;
        self
    }

    /// 当前是否有未完成的语句
    pub fn is_accumulating(&self) -> bool {
        matches!(self.state, AssemblerState::Accumulating(_))
    }

    /// 已处理的物理行数
    pub fn line_count(&self) -> usize {
        self.line_num
    }

    /// 目前为止跳过的行数（无论是否保留明细）
    pub fn skipped_count(&self) -> usize {
        self.skipped_count
    }

    /// 取走尚未取走的跳过行明细
    pub fn take_skipped(&mut self) -> Vec<SkippedLine> {
        std::mem::take(&mut self.skipped)
    }

    /// 处理一行输入，若这一行结束了上一条语句则返回该语句
    pub fn push_line(&mut self, raw: &str) -> Option<StatementRecord> {
        self.line_num += 1;

        // 行首可能带有空白和无效 UTF-8 产生的替换字符
        let line = raw
            .trim_start_matches(&[' ', '\t', '\u{FFFD}'][..])
            .trim_end();
        if line.is_empty() {
            return None;
        }

        match self.classify_line(line) {
            LineHead::Statement { timestamp, body } => {
                let finished = self.take_current();
                self.state = AssemblerState::Accumulating(StatementRecord::new(
                    timestamp,
                    body.trim(),
                ));
                finished
            }
            LineHead::TimestampOnly => {
                tracing::trace!(line = self.line_num, "时间戳行缺少语句标记，状态重置");
                self.skip(SkipReason::NoMarker, line);
                self.take_current()
            }
            LineHead::Continuation => {
                if let AssemblerState::Accumulating(record) = &mut self.state {
                    record.append_line(line);
                    return None;
                }
                self.skip(SkipReason::Orphan, line);
                None
            }
        }
    }

    /// 输入结束：产出未完成的语句（如果有）
    pub fn finish(&mut self) -> Option<StatementRecord> {
        self.take_current()
    }

    fn take_current(&mut self) -> Option<StatementRecord> {
        match std::mem::take(&mut self.state) {
            AssemblerState::Accumulating(record) => Some(record.finalize()),
            AssemblerState::Idle => None,
        }
    }

    fn skip(&mut self, reason: SkipReason, line: &str) {
        tracing::debug!(line = self.line_num, %reason, "跳过输入行");
        self.skipped_count += 1;
        if !self.collect {
            return;
        }
        self.skipped.push(SkippedLine {
            line: self.line_num,
            reason,
            raw: line.to_string(),
        });
    }

    fn classify_line<'a>(&self, line: &'a str) -> LineHead<'a> {
        if !line.as_bytes()[0].is_ascii_digit() {
            return LineHead::Continuation;
        }
        let Some(ts_len) = timestamp_prefix_len(line) else {
            return LineHead::Continuation;
        };

        let timestamp = &line[..ts_len];
        let rest = &line[ts_len..];
        match find_body(rest, self.dialect) {
            Some(body) => LineHead::Statement { timestamp, body },
            None => LineHead::TimestampOnly,
        }
    }
}

/// 在时间戳之后的文本中定位语句正文
fn find_body(rest: &str, dialect: LogDialect) -> Option<&str> {
    match dialect {
        LogDialect::Statement => {
            // 标记只含 ASCII，小写化不改变字节偏移
            let pos = rest.to_ascii_lowercase().find(STATEMENT_MARKER)?;
            Some(&rest[pos + STATEMENT_MARKER.len()..])
        }
        LogDialect::Generic => {
            let bytes = rest.as_bytes();
            let pos = bytes.windows(2).position(|w| {
                w[0] == b':' && w[1].is_ascii_whitespace()
            })?;
            Some(rest[pos + 1..].trim_start())
        }
    }
}

/// 把行序列惰性地转换为语句序列
///
/// 读取错误原样向上传递；调用方在错误之后不应继续迭代。
/// 跳过行只计数，需要明细时直接驱动 [`StatementAssembler`]。
pub struct Statements<I> {
    lines: I,
    assembler: StatementAssembler,
    done: bool,
}

impl<I> Statements<I>
where
    I: Iterator<Item = Result<String>>,
{
    pub fn new(lines: I, dialect: LogDialect) -> Self {
        Self { lines, assembler: StatementAssembler::new(dialect), done: false }
    }

    /// 目前为止跳过的行数
    pub fn skipped_count(&self) -> usize {
        self.assembler.skipped_count()
    }

    /// 已处理的物理行数
    pub fn line_count(&self) -> usize {
        self.assembler.line_count()
    }
}

impl<I> Iterator for Statements<I>
where
    I: Iterator<Item = Result<String>>,
{
    type Item = Result<StatementRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.lines.next() {
                Some(Ok(line)) => {
                    if let Some(record) = self.assembler.push_line(&line) {
                        return Some(Ok(record));
                    }
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    return self.assembler.finish().map(Ok);
                }
            }
        }
    }
}
