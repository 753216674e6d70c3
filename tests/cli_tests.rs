//! 命令行集成测试

mod common;

use common::{TWO_SELECTS, create_test_log, log_files, read_opt};
use std::process::Command;
use tempfile::TempDir;

fn cli(dir: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sqllog-summary"));
    // 日志目录 logs/ 写在临时目录里
    cmd.current_dir(dir.path());
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_missing_input_argument_exits_1() {
    let dir = TempDir::new().unwrap();
    let out = cli(&dir).output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(!out.stderr.is_empty());
}

#[test]
fn test_invalid_chunk_size_exits_1() {
    let dir = TempDir::new().unwrap();
    let input = create_test_log(&dir, "pg.log", TWO_SELECTS);
    let out = cli(&dir).arg(&input).arg("lots").output().unwrap();
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn test_oversized_chunk_size_exits_1() {
    let dir = TempDir::new().unwrap();
    let input = create_test_log(&dir, "pg.log", TWO_SELECTS);
    let out = cli(&dir)
        .arg(&input)
        .arg("1e15")
        .arg("--no-archive")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(!out.stderr.is_empty());
}

#[test]
fn test_help_exits_0() {
    let dir = TempDir::new().unwrap();
    let out = cli(&dir).arg("--help").output().unwrap();
    assert_eq!(out.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&out.stdout).contains("--granularity"));
}

#[test]
fn test_run_without_archive() {
    let dir = TempDir::new().unwrap();
    let input = create_test_log(&dir, "pg.log", TWO_SELECTS);
    let work = dir.path().join("work");

    let out = cli(&dir)
        .arg(&input)
        .arg("0")
        .arg("--work-dir")
        .arg(&work)
        .arg("--no-archive")
        .arg("--log-level")
        .arg("warn")
        .output()
        .unwrap();

    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(
        read_opt(&work, "daily_summary.log").unwrap(),
        "2024-01-01 | SELECT * FROM users WHERE id = $num | 2\n"
    );
    assert!(String::from_utf8_lossy(&out.stdout).contains("daily_summary.log"));
}

#[test]
fn test_run_with_archive_and_config_file() {
    let dir = TempDir::new().unwrap();
    let input = create_test_log(&dir, "pg.log", TWO_SELECTS);
    let work = dir.path().join("out");
    let config = create_test_log(
        &dir,
        "summary.toml",
        &format!(
            "[log]\nenable_stdout = false\nlevel = \"error\"\n\n[digest]\ngranularity = \"minute\"\nwork_dir = {:?}\n",
            work.to_string_lossy()
        ),
    );

    let out = cli(&dir)
        .arg(&input)
        .arg("--config")
        .arg(&config)
        .output()
        .unwrap();

    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(log_files(&work).is_empty());
    let archives: Vec<String> = std::fs::read_dir(&work)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".tar.gz"))
        .collect();
    assert_eq!(archives.len(), 1);
    assert!(archives[0].starts_with("pg-minute-"));
}

#[test]
fn test_missing_input_file_exits_1() {
    let dir = TempDir::new().unwrap();
    let out = cli(&dir)
        .arg(dir.path().join("absent.log"))
        .arg("--no-archive")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
}
