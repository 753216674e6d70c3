//! PostgreSQL 语句日志汇总工具库
//!
//! 把日志中跨行的 SQL 语句重组为完整记录，按 (操作类型, 日期) 分桶，
//! 再把字面量替换为占位符后按桶标签计数，输出汇总文件并打包归档。

pub mod aggregate;
pub mod archive;
pub mod bucket;
pub mod config;
pub mod error;
#[cfg(feature = "logging")]
pub mod logging;
pub mod pipeline;
pub mod skipped_writer;
pub mod sqllog;

pub use config::Config;
pub use error::{Result, SummaryError};
pub use pipeline::{RunReport, run, run_lines};
