//! tmpfile 通道的临时文件管理
//!
//! 截图文件统一以 `view-snapshot-` 为前缀，便于释放和清理

use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::Builder;
use tracing::{info, warn};
use url::Url;

use crate::models::OutputFormat;

/// 临时截图文件名前缀
pub const TEMP_FILE_PREFIX: &str = "view-snapshot-";

/// 在指定目录创建一个唯一的临时截图文件并返回路径
///
/// 文件会被保留，调用方把路径作为 tmpfile 通道的目标
pub fn create_temp_file(dir: &Path, format: OutputFormat) -> Result<PathBuf> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }

    let temp_file = Builder::new()
        .prefix(TEMP_FILE_PREFIX)
        .suffix(&format!(".{}", format.extension()))
        .tempfile_in(dir)
        .map_err(|e| anyhow::anyhow!("创建临时文件失败: {}", e))?;

    let (file, path) = temp_file
        .keep()
        .map_err(|e| anyhow::anyhow!("保留临时文件失败: {}", e.error))?;
    drop(file);

    Ok(path)
}

/// 判断路径是否为 dir 下由本模块创建的截图文件
fn is_snapshot_file(path: &Path, dir: &Path) -> bool {
    let in_dir = path.parent().map(|parent| parent == dir).unwrap_or(false);
    let prefixed = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with(TEMP_FILE_PREFIX))
        .unwrap_or(false);
    in_dir && prefixed
}

/// 释放之前返回的截图文件
///
/// 只删除 dir 下带前缀的文件，返回是否删除了文件
pub fn release_capture(uri: &str, dir: &Path) -> Result<bool> {
    let path = if uri.starts_with("file:") {
        Url::parse(uri)
            .ok()
            .and_then(|url| url.to_file_path().ok())
            .ok_or_else(|| anyhow::anyhow!("无效的文件 URI: {}", uri))?
    } else {
        PathBuf::from(uri)
    };

    if !is_snapshot_file(&path, dir) {
        warn!("拒绝释放非截图文件: {}", uri);
        return Ok(false);
    }

    if !path.exists() {
        return Ok(false);
    }

    std::fs::remove_file(&path)?;
    Ok(true)
}

/// 清理目录下所有遗留的截图文件，返回删除数量
pub fn cleanup_temp_files(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut cleaned = 0;
    for entry in std::fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if path.is_file() && is_snapshot_file(&path, dir) {
            match std::fs::remove_file(&path) {
                Ok(()) => cleaned += 1,
                Err(e) => warn!("删除临时截图失败 {}: {}", path.display(), e),
            }
        }
    }

    info!("已清理 {} 个临时截图", cleaned);
    Ok(cleaned)
}
