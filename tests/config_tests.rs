//! 配置文件集成测试

use sqllog_summary::Config;
use sqllog_summary::sqllog::{Granularity, LogDialect, ReadMode};
use tempfile::TempDir;

#[test]
fn test_config_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");

    let mut config = Config::default();
    config.log.level = "debug".to_string();
    config.digest.granularity = Granularity::Minute;
    config.digest.dialect = LogDialect::Generic;
    config.digest.chunk_size_mb = 0.25;
    config.digest.flush_threshold = 64;
    config.archive.cleanup = false;
    config.save_to_file(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.log.level, "debug");
    assert_eq!(loaded.digest.granularity, Granularity::Minute);
    assert_eq!(loaded.digest.dialect, LogDialect::Generic);
    assert_eq!(loaded.digest.chunk_size_mb, 0.25);
    assert_eq!(loaded.digest.flush_threshold, 64);
    assert!(loaded.archive.enabled);
    assert!(!loaded.archive.cleanup);
}

#[test]
fn test_partial_config_uses_defaults() {
    let config = Config::from_str(
        r#"
[digest]
granularity = "minute"
chunk_size_mb = 0.0
"#,
    )
    .unwrap();

    assert_eq!(config.digest.granularity, Granularity::Minute);
    assert_eq!(config.digest.read_mode(), ReadMode::Lines);
    assert_eq!(config.digest.flush_threshold, 1000);
    assert_eq!(config.digest.work_dir, ".");
    assert_eq!(config.log.level, "info");
    assert!(config.archive.enabled);
}

#[test]
fn test_invalid_configs_rejected() {
    let bad_level = Config::from_str("[log]\nlevel = \"loud\"\n").unwrap_err();
    assert!(bad_level.is_config_error());

    let zero_flush = Config::from_str("[digest]\nflush_threshold = 0\n").unwrap_err();
    assert!(zero_flush.is_config_error());

    let negative_chunk = Config::from_str("[digest]\nchunk_size_mb = -2.0\n").unwrap_err();
    assert!(negative_chunk.is_config_error());

    let huge_chunk = Config::from_str("[digest]\nchunk_size_mb = 1e15\n").unwrap_err();
    assert!(huge_chunk.is_config_error());

    let bad_granularity =
        Config::from_str("[digest]\ngranularity = \"hourly\"\n").unwrap_err();
    assert!(bad_granularity.is_config_error());

    let no_report_path = Config::from_str(
        "[digest]\nwrite_skipped = true\nskipped_out_path = \"\"\n",
    )
    .unwrap_err();
    assert!(no_report_path.is_config_error());
}

#[test]
fn test_missing_config_file() {
    let dir = TempDir::new().unwrap();
    let err = Config::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(err.is_io_error());
}
