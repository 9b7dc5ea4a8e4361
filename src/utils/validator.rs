use anyhow::Result;
use std::path::Path;
use url::Url;

use crate::core::task::planner::MAX_CHUNK_SIZE_MIB;

/// 只接受带主机名的 http / https 链接
pub fn is_valid_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some(),
        Err(_) => false,
    }
}

/// <= 0 表示使用默认值，因此合法
pub fn validate_chunk_size(chunk_size_mib: i64) -> Result<()> {
    if chunk_size_mib > MAX_CHUNK_SIZE_MIB {
        anyhow::bail!("分块大小不能超过 {} MiB", MAX_CHUNK_SIZE_MIB);
    }
    Ok(())
}

pub fn validate_output_path(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        anyhow::bail!("输出路径不能为空");
    }
    if Path::new(path).is_file() {
        anyhow::bail!("输出路径已存在且不是目录: {}", path);
    }
    Ok(())
}

pub fn validate_urls(urls: &[String]) -> Result<()> {
    if urls.is_empty() {
        anyhow::bail!("URL列表不能为空");
    }
    if let Some(bad) = urls.iter().find(|url| !is_valid_url(url)) {
        anyhow::bail!("不是有效的 http/https 链接: {}", bad);
    }
    Ok(())
}
