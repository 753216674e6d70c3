//! 集成测试公共模块

use sqllog_summary::Config;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// 创建测试用的日志文件
#[allow(dead_code)]
pub fn create_test_log(dir: &TempDir, filename: &str, content: &str) -> PathBuf {
    let file_path = dir.path().join(filename);
    fs::write(&file_path, content).expect("Failed to write test file");
    file_path
}

/// 输出到 `work_dir`、不打包归档的配置
#[allow(dead_code)]
pub fn scratch_config(work_dir: &Path) -> Config {
    let mut config = Config::default();
    config.digest.work_dir = work_dir.to_string_lossy().into_owned();
    config.archive.enabled = false;
    config
}

/// 读取工作目录下的文件内容，不存在时返回 None
#[allow(dead_code)]
pub fn read_opt(dir: &Path, name: &str) -> Option<String> {
    fs::read_to_string(dir.join(name)).ok()
}

/// 工作目录下所有 `.log` 文件名（排序）
#[allow(dead_code)]
pub fn log_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read work dir")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".log"))
        .collect();
    names.sort();
    names
}

/// 两条形状相同的 SELECT 语句
#[allow(dead_code)]
pub const TWO_SELECTS: &str = "\
2024-01-01 10:00:01 LOG:  statement: SELECT * FROM users WHERE id = 5;
2024-01-01 10:00:02 LOG:  statement: SELECT * FROM users WHERE id = 9;
";

/// 混合了多行语句、非语句日志和跨天记录的日志
#[allow(dead_code)]
pub const MIXED_LOG: &str = "\
waiting for server to start
2024-01-01 23:59:58.120 UTC [311] LOG:  statement: SELECT name, price
    FROM products
    WHERE price > 19.99
      AND name <> 'it''s 42';
2024-01-01 23:59:58.500 UTC [311] LOG:  duration: 0.512 ms
2024-01-01 23:59:59.001 UTC [312] LOG:  statement: INSERT INTO orders (id, note) VALUES (1001, 'first');
2024-01-02 00:00:00.010 UTC [312] LOG:  statement: insert into orders (id, note) values (1002, 'second')
2024-01-02 00:00:01.000 UTC [313] LOG:  statement: WITH recent AS (SELECT * FROM orders WHERE id > 10)
SELECT count(*) FROM recent;
2024-01-02 00:00:02.000 UTC [313] LOG:  statement: UPDATE products SET price = 5 WHERE id = 3;
2024-01-02 00:00:03.000 UTC [313] LOG:  statement: DELETE FROM orders WHERE id = 7
2024-01-02 00:00:04.000 UTC [314] LOG:  statement: BEGIN;
2024-01-02 00:00:05.000 UTC [314] LOG:  statement: COMMIT;
";
