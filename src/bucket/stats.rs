//! 分桶写入统计信息模块

use crate::sqllog::types::OperationKind;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// 分桶写入统计信息
#[derive(Debug, Default, Clone)]
pub struct RouteStats {
    /// 已分桶的记录数
    pub routed_records: usize,
    /// 因时间戳为空而丢弃的记录数
    pub dropped_records: usize,
    /// 已写入磁盘的行数
    pub flushed_lines: usize,
    /// 缓冲区写盘次数
    pub flushes: usize,
    /// 各操作类型的记录数
    pub per_kind: BTreeMap<OperationKind, usize>,
    /// 开始时间
    pub start_time: Option<Instant>,
    /// 完成时间
    pub end_time: Option<Instant>,
}

impl RouteStats {
    /// 创建新的统计信息，记录开始时间
    pub fn new() -> Self {
        Self { start_time: Some(Instant::now()), ..Default::default() }
    }

    /// 记录一条已分桶的记录
    pub fn record(&mut self, kind: OperationKind) {
        self.routed_records += 1;
        *self.per_kind.entry(kind).or_insert(0) += 1;
    }

    /// 标记完成，记录结束时间
    pub fn finish(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// 持续时间
    pub fn duration(&self) -> Option<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end.duration_since(start)),
            _ => None,
        }
    }

    /// 每秒处理记录数
    pub fn records_per_second(&self) -> Option<f64> {
        self.duration().map(|d| {
            if d.as_secs_f64() > 0.0 {
                self.routed_records as f64 / d.as_secs_f64()
            } else {
                0.0
            }
        })
    }

    /// 尚在缓冲区、未写盘的行数
    pub fn pending_lines(&self) -> usize {
        self.routed_records.saturating_sub(self.flushed_lines)
    }
}

impl std::fmt::Display for RouteStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "记录: {}", self.routed_records)?;
        for (kind, count) in &self.per_kind {
            write!(f, ", {kind}: {count}")?;
        }
        if self.dropped_records > 0 {
            write!(f, ", 丢弃: {}", self.dropped_records)?;
        }
        write!(f, ", 写盘 {} 次", self.flushes)?;

        if let Some(duration) = self.duration() {
            write!(f, ", 耗时: {:.2}s", duration.as_secs_f64())?;
            if let Some(rps) = self.records_per_second() {
                write!(f, ", 速度: {:.2} 记录/秒", rps)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts_per_kind() {
        let mut s = RouteStats::new();
        s.record(OperationKind::Select);
        s.record(OperationKind::Select);
        s.record(OperationKind::Delete);
        assert_eq!(s.routed_records, 3);
        assert_eq!(s.per_kind[&OperationKind::Select], 2);
        assert_eq!(s.per_kind[&OperationKind::Delete], 1);
        assert!(!s.per_kind.contains_key(&OperationKind::Insert));

        s.flushed_lines = 1;
        assert_eq!(s.pending_lines(), 2);
    }

    #[test]
    fn test_display_without_finish() {
        let mut s = RouteStats::new();
        s.record(OperationKind::Other);
        let out = format!("{s}");
        assert!(out.contains("记录: 1"));
        assert!(out.contains("OTHER: 1"));
        assert!(!out.contains("耗时"));
    }

    #[test]
    fn test_records_per_second_zero_duration() {
        let mut s = RouteStats::new();
        s.routed_records = 1;
        if let Some(start) = s.start_time {
            s.end_time = Some(start);
        }
        assert_eq!(s.records_per_second().unwrap(), 0.0);
        assert!(format!("{s}").contains("速度"));
    }

    #[test]
    fn test_duration_none_by_default() {
        let s = RouteStats::default();
        assert!(s.duration().is_none());
        assert!(s.records_per_second().is_none());
    }
}
