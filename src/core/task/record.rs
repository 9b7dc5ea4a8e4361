use serde::{Serialize, Deserialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::error::DownloadError;

/// 侧车进度文件的扩展名
pub const TEMP_EXT: &str = ".cache";

/// 单个下载任务的持久化进度
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRecord {
    #[serde(rename = "sourceURL")]
    pub source_url: String,
    pub save_path: PathBuf,
    pub temp_path: PathBuf,
    pub percent: f32,
    pub total_bytes: u64,
    pub bytes_downloaded: u64,
}

impl DownloadRecord {
    pub fn new(source_url: &str, save_path: &Path) -> Self {
        DownloadRecord {
            source_url: source_url.to_string(),
            save_path: save_path.to_path_buf(),
            temp_path: temp_path_for(save_path),
            percent: 0.0,
            total_bytes: 0,
            bytes_downloaded: 0,
        }
    }

    /// 以远端大小重新开始
    pub fn reset(&mut self, total_bytes: u64) {
        self.total_bytes = total_bytes;
        self.bytes_downloaded = 0;
        self.percent = 0.0;
    }

    pub fn compute_percent(&self) -> f32 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        (self.bytes_downloaded as f64 / self.total_bytes as f64 * 100.0) as f32
    }

    /// 追加写入 `len` 字节后推进进度
    pub fn advance(&mut self, len: u64) {
        self.bytes_downloaded += len;
        self.percent = self.compute_percent();
    }

    pub fn is_complete(&self) -> bool {
        self.total_bytes > 0 && self.bytes_downloaded >= self.total_bytes
    }

    /// 只修正百分比；已下载字节数始终以实际写入为准
    pub fn mark_completed(&mut self) {
        // 直接写 100，避免浮点误差
        self.percent = 100.0;
    }
}

/// `savePath + ".cache"`
pub fn temp_path_for(save_path: &Path) -> PathBuf {
    let mut raw = save_path.as_os_str().to_os_string();
    raw.push(TEMP_EXT);
    PathBuf::from(raw)
}

/// 进度文件读写。不做任何缓存：每次 load 都重新读盘，每次 save 都整体覆盖。
pub struct ProgressStore;

impl ProgressStore {
    /// 读取侧车文件；不存在或无法解析都视为没有历史记录
    pub fn load(temp_path: &Path) -> Option<DownloadRecord> {
        let content = match fs::read_to_string(temp_path) {
            Ok(content) => content,
            Err(_) => return None,
        };
        match serde_json::from_str::<DownloadRecord>(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("进度文件无法解析, 忽略: {} ({})", temp_path.display(), e);
                None
            }
        }
    }

    /// 覆盖写入侧车文件，返回前保证数据已落盘
    pub fn save(record: &DownloadRecord) -> Result<(), DownloadError> {
        if let Some(parent) = record.temp_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    DownloadError::Persistence(format!("创建目录失败 {}: {}", parent.display(), e))
                })?;
            }
        }

        let json = serde_json::to_string_pretty(record)?;
        let mut file = File::create(&record.temp_path).map_err(|e| {
            DownloadError::Persistence(format!("写入失败 {}: {}", record.temp_path.display(), e))
        })?;
        file.write_all(json.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| {
                DownloadError::Persistence(format!("写入失败 {}: {}", record.temp_path.display(), e))
            })?;
        Ok(())
    }
}
