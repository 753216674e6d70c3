//! 归档与清理
//!
//! 运行结束后把汇总文件和桶文件打包为 `tar.gz`，再删除这些临时文件。
//! 只删除本次运行创建的文件，输入文件和归档本身不会被删除。

use crate::error::Result;
use crate::sqllog::types::Granularity;
use chrono::{DateTime, Local};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::path::{Path, PathBuf};

/// 一次打包的内容
#[derive(Debug, Clone)]
pub struct ArchivePlan {
    /// 归档输出目录
    pub work_dir: PathBuf,
    /// 输入文件名（不含扩展名）
    pub input_stem: String,
    pub granularity: Granularity,
    /// 要打包的文件，按文件名存入归档
    pub members: Vec<PathBuf>,
}

/// 归档文件名
///
/// - 日粒度：`<stem>-<YYYY-mm-dd_HH-MM-SS>.tar.gz`
/// - 分钟粒度：`<stem>-minute-<YYYY-mm-dd_HH-MM-SS>.tar.gz`
pub fn archive_file_name(
    input_stem: &str,
    granularity: Granularity,
    at: &DateTime<Local>,
) -> String {
    let ts = at.format("%Y-%m-%d_%H-%M-%S");
    match granularity {
        Granularity::Daily => format!("{input_stem}-{ts}.tar.gz"),
        Granularity::Minute => format!("{input_stem}-minute-{ts}.tar.gz"),
    }
}

/// 打包归档，没有可打包的文件时返回 `None`
pub fn package(plan: &ArchivePlan) -> Result<Option<PathBuf>> {
    let members: Vec<&PathBuf> = plan.members.iter().filter(|p| p.is_file()).collect();
    if members.is_empty() {
        tracing::info!("没有需要归档的文件");
        return Ok(None);
    }

    let name = archive_file_name(&plan.input_stem, plan.granularity, &Local::now());
    let archive_path = plan.work_dir.join(name);

    if let Err(e) = write_archive(&archive_path, &members) {
        // 不留下写了一半的归档
        if archive_path.is_file() {
            let _ = std::fs::remove_file(&archive_path);
        }
        return Err(e);
    }

    tracing::info!(
        "已归档 {} 个文件 -> {}",
        members.len(),
        archive_path.display()
    );
    Ok(Some(archive_path))
}

fn write_archive(archive_path: &Path, members: &[&PathBuf]) -> Result<()> {
    let encoder = GzEncoder::new(File::create(archive_path)?, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for path in members {
        let Some(name) = path.file_name() else {
            continue;
        };
        tracing::debug!("归档 {}", path.display());
        builder.append_path_with_name(path, name)?;
    }
    builder.into_inner()?.finish()?;
    Ok(())
}

/// 删除临时文件，返回删除失败的数量
///
/// 删除失败只记录警告；文件已不存在不算失败。
pub fn cleanup<P: AsRef<Path>>(paths: &[P]) -> usize {
    let mut failures = 0;
    for path in paths {
        let path = path.as_ref();
        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!("已删除 {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("{} 已不存在", path.display());
            }
            Err(e) => {
                tracing::warn!("删除 {} 失败: {}", path.display(), e);
                failures += 1;
            }
        }
    }
    failures
}
