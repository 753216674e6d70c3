use serde::{Deserialize, Serialize};
use std::fmt;

/// 一条重组完成的 SQL 语句记录
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatementRecord {
    /// 日志行开头的时间戳原文（不做解析）
    pub timestamp: String,
    /// 语句正文：首行标记后的文本加上所有续行，以空格拼接
    pub body: String,
}

impl StatementRecord {
    pub fn new<T: Into<String>, B: Into<String>>(timestamp: T, body: B) -> Self {
        Self { timestamp: timestamp.into(), body: body.into() }
    }

    /// 追加一行续行内容
    pub(crate) fn append_line(&mut self, line: &str) {
        if !self.body.is_empty() {
            self.body.push(' ');
        }
        self.body.push_str(line);
    }

    /// 去掉正文末尾的分号，记录定稿
    pub(crate) fn finalize(mut self) -> Self {
        let trimmed = self.body.trim_end().trim_end_matches(';').trim_end();
        if trimmed.len() != self.body.len() {
            self.body.truncate(trimmed.len());
        }
        self
    }
}

/// 语句操作类型，由正文首个关键字决定
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
)]
pub enum OperationKind {
    Select,
    Insert,
    Update,
    Delete,
    Other,
}

impl OperationKind {
    pub const ALL: [OperationKind; 5] = [
        OperationKind::Select,
        OperationKind::Insert,
        OperationKind::Update,
        OperationKind::Delete,
        OperationKind::Other,
    ];

    /// 根据语句正文分类，`WITH` 开头的语句按 SELECT 计
    pub fn classify(body: &str) -> Self {
        let first = body.split_whitespace().next().unwrap_or("");
        if first.eq_ignore_ascii_case("select") || first.eq_ignore_ascii_case("with") {
            Self::Select
        } else if first.eq_ignore_ascii_case("insert") {
            Self::Insert
        } else if first.eq_ignore_ascii_case("update") {
            Self::Update
        } else if first.eq_ignore_ascii_case("delete") {
            Self::Delete
        } else {
            Self::Other
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 桶文件的键：(操作类型, 日期)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    pub kind: OperationKind,
    pub day: String,
}

impl BucketKey {
    pub fn new<S: Into<String>>(kind: OperationKind, day: S) -> Self {
        Self { kind, day: day.into() }
    }

    /// 桶文件名，例如 `SELECT_2024-01-01.log`
    pub fn file_name(&self) -> String {
        store_file_name(self.kind, &self.day)
    }
}

/// 桶文件名的唯一生成规则，写入端和汇总端共用
pub fn store_file_name(kind: OperationKind, day: &str) -> String {
    format!("{}_{}.log", kind.as_str(), day)
}

/// 汇总粒度
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// 按日期（时间戳的第一个字段）
    #[default]
    Daily,
    /// 截断到分钟，`YYYY-MM-DD HH:MM`
    Minute,
}

impl std::str::FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" | "day" => Ok(Self::Daily),
            "minute" | "min" => Ok(Self::Minute),
            other => Err(format!("未知的汇总粒度: {other}")),
        }
    }
}

/// 日志方言：决定首行中语句正文从哪里开始
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogDialect {
    /// 正文位于第一个 `statement: ` 之后（不区分大小写）
    #[default]
    Statement,
    /// 正文位于时间戳之后第一个“冒号 + 空白”之后
    Generic,
}

impl std::str::FromStr for LogDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "statement" => Ok(Self::Statement),
            "generic" => Ok(Self::Generic),
            other => Err(format!("未知的日志方言: {other}")),
        }
    }
}

/// 输入读取方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// 按行读取
    Lines,
    /// 按固定字节数分块读取，跨块的行会被重新拼接
    Chunked { chunk_bytes: usize },
}

/// 汇总文件中的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryEntry {
    pub bucket_label: String,
    pub normalized_statement: String,
    pub count: u64,
}

impl SummaryEntry {
    /// 汇总文件行格式：`<label> | <normalized> | <count>`
    pub fn to_line(&self) -> String {
        format!(
            "{} | {} | {}\n",
            self.bucket_label, self.normalized_statement, self.count
        )
    }
}

/// 被跳过的一行输入，用于日志和跳过行报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLine {
    /// 行号（从 1 开始）
    pub line: usize,
    /// 跳过原因
    pub reason: SkipReason,
    /// 原始内容
    pub raw: String,
}

/// 跳过原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// 尚未开始任何语句时出现的非时间戳行
    Orphan,
    /// 带时间戳但没有语句标记的行
    NoMarker,
    /// 桶文件中缺少 ` | ` 分隔符的行
    Malformed,
    /// 分钟粒度下无法解析的时间戳
    BadTimestamp,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Orphan => "语句开始前的孤立行",
            Self::NoMarker => "缺少语句标记",
            Self::Malformed => "缺少分隔符",
            Self::BadTimestamp => "时间戳无法解析",
        };
        f.write_str(s)
    }
}
