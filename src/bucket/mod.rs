//! 分桶模块
//!
//! 把重组好的语句按 (操作类型, 日期) 写入临时桶文件，供汇总阶段读取

pub mod stats;
pub mod writer;

pub use stats::RouteStats;
pub use writer::{BucketWriter, DEFAULT_FLUSH_THRESHOLD, WrittenStores};
