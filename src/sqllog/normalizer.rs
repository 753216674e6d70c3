//! SQL 语句归一化
//!
//! 把语句中的字面量替换为占位符，得到用于计数的“语句形状”：
//!
//! ```text
//! SELECT * FROM users WHERE name = 'bob' AND score > 9.5 LIMIT 10
//!   → SELECT * FROM users WHERE name = $str AND score > $num LIMIT $num
//! ```
//!
//! 替换顺序固定：先字符串，再小数，最后整数。字符串必须最先处理，
//! 否则引号内的数字会先被替换。结果按原文缓存，同一次运行中每个不同的
//! 正文只计算一次。缓存属于单次运行，由调用方持有并以 `&mut` 传递。

use lazy_static::lazy_static;
use regex::{NoExpand, Regex};
use std::collections::HashMap;

/// 字符串字面量占位符
pub const STR_PLACEHOLDER: &str = "$str";
/// 数字字面量占位符
pub const NUM_PLACEHOLDER: &str = "$num";

lazy_static! {
    // 单引号字符串，内部的 '' 视为转义的引号
    static ref STRING_RE: Regex = Regex::new(r"'(?:''|[^'])*'").unwrap();
    static ref DECIMAL_RE: Regex = Regex::new(r"\b\d+\.\d+\b").unwrap();
    static ref INTEGER_RE: Regex = Regex::new(r"\b\d+\b").unwrap();
}

/// 带缓存的语句归一化器
#[derive(Debug, Default)]
pub struct Normalizer {
    cache: HashMap<String, String>,
    hits: u64,
    misses: u64,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 归一化一条语句正文；命中缓存时直接返回已计算的结果
    pub fn normalize(&mut self, body: &str) -> &str {
        if self.cache.contains_key(body) {
            self.hits += 1;
        } else {
            self.misses += 1;
            let normalized = normalize_uncached(body);
            tracing::trace!(body, normalized = %normalized, "归一化缓存未命中");
            self.cache.insert(body.to_string(), normalized);
        }
        &self.cache[body]
    }

    /// 缓存命中次数
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// 缓存未命中（实际计算）次数
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// 缓存中不同正文的数量
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// 不经过缓存的归一化实现
#[must_use]
pub fn normalize_uncached(body: &str) -> String {
    // 占位符本身含有 `$`，必须用 NoExpand 避免被当作捕获组引用
    let replaced = STRING_RE.replace_all(body, NoExpand(STR_PLACEHOLDER));
    let replaced = DECIMAL_RE.replace_all(&replaced, NoExpand(NUM_PLACEHOLDER));
    let replaced = INTEGER_RE.replace_all(&replaced, NoExpand(NUM_PLACEHOLDER));
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_replaced() {
        assert_eq!(
            normalize_uncached("SELECT * FROM users WHERE id = 5"),
            "SELECT * FROM users WHERE id = $num"
        );
        assert_eq!(
            normalize_uncached("UPDATE t SET price = 19.99 WHERE id=42"),
            "UPDATE t SET price = $num WHERE id=$num"
        );
        // 标识符中的数字不是独立的字面量
        assert_eq!(
            normalize_uncached("SELECT col1 FROM t2 WHERE x = 7"),
            "SELECT col1 FROM t2 WHERE x = $num"
        );
    }

    #[test]
    fn test_strings_replaced_before_numbers() {
        assert_eq!(
            normalize_uncached("SELECT * FROM t WHERE code = 'A-123' AND n = 3"),
            "SELECT * FROM t WHERE code = $str AND n = $num"
        );
        assert_eq!(
            normalize_uncached("INSERT INTO t VALUES ('it''s 42', 'x')"),
            "INSERT INTO t VALUES ($str, $str)"
        );
        assert_eq!(normalize_uncached("SELECT ''"), "SELECT $str");
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(
            normalize_uncached("  SELECT\t*\n  FROM   t  "),
            "SELECT * FROM t"
        );
        assert_eq!(normalize_uncached(""), "");
        assert_eq!(normalize_uncached("   "), "");
    }

    #[test]
    fn test_cache_hit_on_second_call() {
        let mut n = Normalizer::new();
        let first = n.normalize("SELECT 1").to_string();
        assert_eq!((n.hits(), n.misses()), (0, 1));

        let second = n.normalize("SELECT 1").to_string();
        assert_eq!(first, second);
        assert_eq!((n.hits(), n.misses()), (1, 1));

        // 不同原文即使形状相同也各自缓存
        assert_eq!(n.normalize("SELECT 2"), "SELECT $num");
        assert_eq!(n.len(), 2);
        assert_eq!(n.misses(), 2);
    }
}
