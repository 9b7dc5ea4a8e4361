//! 分块范围规划，以及 HEAD 之后的重新开始 / 续传 / 已完成判定。

use crate::core::error::DownloadError;
use super::record::DownloadRecord;

pub const MIB: u64 = 1024 * 1024;

/// 未配置时的默认分块大小 (MiB)
pub const DEFAULT_CHUNK_SIZE_MIB: u64 = 2;

/// 分块大小上限 (MiB)
pub const MAX_CHUNK_SIZE_MIB: i64 = 1024;

/// 将调用方给出的 MiB 数换算为字节，非正数使用默认值，超过上限按上限计算
pub fn chunk_size_bytes(chunk_size_mib: i64) -> u64 {
    if chunk_size_mib > 0 {
        chunk_size_mib.min(MAX_CHUNK_SIZE_MIB) as u64 * MIB
    } else {
        DEFAULT_CHUNK_SIZE_MIB * MIB
    }
}

/// 闭区间字节范围 `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Range` 请求头的值
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// 计算下一个要请求的范围；`Ok(None)` 表示没有剩余数据。
///
/// 分块大小为 0 时无法推进，返回配置错误。
pub fn next_range(
    bytes_downloaded: u64,
    total_bytes: u64,
    chunk_size: u64,
) -> Result<Option<ByteRange>, DownloadError> {
    if chunk_size == 0 {
        return Err(DownloadError::invalid_config("分块大小必须大于0"));
    }
    if bytes_downloaded >= total_bytes {
        return Ok(None);
    }
    let start = bytes_downloaded;
    let end = start.saturating_add(chunk_size - 1).min(total_bytes - 1);
    Ok(Some(ByteRange { start, end }))
}

/// HEAD 之后要采取的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeAction {
    /// 删除旧文件，从 0 开始
    FreshStart,
    /// 本地文件已完整，无需传输
    AlreadyComplete,
    /// 从 `offset` 继续
    Resume { offset: u64 },
}

/// 协调远端大小、历史进度与本地文件，决定如何继续。
///
/// `on_disk_size` 为目标文件当前的实际大小（不存在为 `None`）。
/// 记录与磁盘不一致、记录属于其他 URL、或任何无法解释的组合都退回 `FreshStart`。
pub fn reconcile(
    remote_size: u64,
    source_url: &str,
    record: Option<&DownloadRecord>,
    force_download: bool,
    on_disk_size: Option<u64>,
) -> ResumeAction {
    let record = match record {
        Some(record) => record,
        None => return ResumeAction::FreshStart,
    };

    if force_download
        || record.bytes_downloaded == 0
        || record.total_bytes != remote_size
        || record.source_url != source_url
    {
        return ResumeAction::FreshStart;
    }

    // 记录必须与磁盘上实际写入的字节数一致才可信
    if on_disk_size != Some(record.bytes_downloaded) {
        return ResumeAction::FreshStart;
    }

    if record.bytes_downloaded == record.total_bytes {
        ResumeAction::AlreadyComplete
    } else if record.bytes_downloaded < record.total_bytes {
        ResumeAction::Resume { offset: record.bytes_downloaded }
    } else {
        ResumeAction::FreshStart
    }
}
