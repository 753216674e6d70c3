//! 时间戳识别与桶标签推导的工具函数

use crate::sqllog::types::Granularity;
use chrono::NaiveDateTime;

/// 时间戳主体 `YYYY-MM-DD HH:MM:SS` 的长度
const DATETIME_LEN: usize = 19;

/// 检查前 19 个字节是否为 `YYYY-MM-DD HH:MM:SS` 的形状
///
/// 只检查数字与分隔符的位置，不做日历校验：不合法的日期仍会被当作记录开头，
/// 是否能参与分钟粒度汇总由 [`bucket_label`] 决定。
#[must_use]
pub fn has_datetime_shape(s: &str) -> bool {
    let b = s.as_bytes();
    if b.len() < DATETIME_LEN {
        return false;
    }

    // 检查所有分隔符位置
    if !(b[4] == b'-'
        && b[7] == b'-'
        && b[10] == b' '
        && b[13] == b':'
        && b[16] == b':')
    {
        return false;
    }

    // 检查所有数字位
    [0, 1, 2, 3, 5, 6, 8, 9, 11, 12, 14, 15, 17, 18]
        .iter()
        .all(|&i| b[i].is_ascii_digit())
}

/// 返回行首时间戳前缀的字节长度
///
/// 接受的形状：`YYYY-MM-DD HH:MM:SS`，可选的小数秒 `.ddd`，
/// 可选的时区后缀（` UTC`、` GMT` 或 `+08`、`-05:00` 这样的偏移）。
#[must_use]
pub fn timestamp_prefix_len(line: &str) -> Option<usize> {
    if !has_datetime_shape(line) {
        return None;
    }

    let b = line.as_bytes();
    let mut end = DATETIME_LEN;

    // 小数秒
    if b.get(end) == Some(&b'.') {
        let digits = b[end + 1..].iter().take_while(|c| c.is_ascii_digit()).count();
        if digits > 0 {
            end += 1 + digits;
        }
    }

    // 时区后缀
    let rest = &line[end..];
    if rest.starts_with(" UTC") || rest.starts_with(" GMT") {
        end += 4;
    } else if let Some(len) = numeric_offset_len(rest) {
        end += len;
    }

    Some(end)
}

/// `+08`、`-0500`、`+05:30` 形式的时区偏移长度
fn numeric_offset_len(rest: &str) -> Option<usize> {
    let b = rest.as_bytes();
    if !matches!(b.first(), Some(b'+' | b'-')) {
        return None;
    }
    if !(b.len() >= 3 && b[1].is_ascii_digit() && b[2].is_ascii_digit()) {
        return None;
    }
    let tail = &b[3..];
    if tail.len() >= 3 && tail[0] == b':' && tail[1].is_ascii_digit() && tail[2].is_ascii_digit() {
        Some(6)
    } else if tail.len() >= 2 && tail[0].is_ascii_digit() && tail[1].is_ascii_digit() {
        Some(5)
    } else {
        Some(3)
    }
}

/// 桶文件使用的日期标签：时间戳的第一个字段
#[must_use]
pub fn day_label(timestamp: &str) -> Option<&str> {
    timestamp.split_whitespace().next()
}

/// 按粒度从时间戳推导汇总标签
///
/// - `Daily`：时间戳的第一个字段
/// - `Minute`：前 19 个字符按 `%Y-%m-%d %H:%M:%S` 解析后截断到分钟，
///   丢弃小数秒和时区后缀；解析失败返回 `None`
#[must_use]
pub fn bucket_label(timestamp: &str, granularity: Granularity) -> Option<String> {
    match granularity {
        Granularity::Daily => day_label(timestamp).map(str::to_string),
        Granularity::Minute => {
            let head = timestamp.get(..DATETIME_LEN)?;
            let dt = NaiveDateTime::parse_from_str(head, "%Y-%m-%d %H:%M:%S").ok()?;
            Some(dt.format("%Y-%m-%d %H:%M").to_string())
        }
    }
}
