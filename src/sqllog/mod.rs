//! SQL 日志解析模块
//!
//! 提供日志行读取、多行语句重组、语句归一化以及相关类型和工具函数

pub mod io;
pub mod normalizer;
pub mod parser;
pub mod types;
pub mod utils;

// 重新导出核心类型和函数
pub use normalizer::Normalizer;
pub use parser::{StatementAssembler, Statements};
pub use types::{
    BucketKey, Granularity, LogDialect, OperationKind, ReadMode, SkipReason,
    SkippedLine, StatementRecord, SummaryEntry,
};
pub use utils::{bucket_label, day_label, timestamp_prefix_len};
