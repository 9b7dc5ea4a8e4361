use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use url::Url;

use crate::config::Config;
use super::planner::chunk_size_bytes;
use super::record::temp_path_for;

/// 无法从 URL 推断文件名时使用
pub const FALLBACK_FILE_NAME: &str = "downloaded_file";

/// 单个任务的配置
#[derive(Debug, Clone, PartialEq)]
pub struct TaskConfig {
    pub url: String,
    /// 调用方定义的存储根目录
    pub storage_root: PathBuf,
    /// 相对 `storage_root` 的目标目录
    pub destination_dir: String,
    pub force_download: bool,
    /// 非正数表示使用默认的 2 MiB
    pub chunk_size_mib: i64,
}

impl TaskConfig {
    pub fn new(url: &str, storage_root: impl Into<PathBuf>, destination_dir: &str) -> Self {
        TaskConfig {
            url: url.to_string(),
            storage_root: storage_root.into(),
            destination_dir: destination_dir.to_string(),
            force_download: false,
            chunk_size_mib: 0,
        }
    }

    pub fn from_config(config: &Config, url: &str) -> Self {
        TaskConfig {
            url: url.to_string(),
            storage_root: PathBuf::from(&config.storage_root),
            destination_dir: config.download_dir.clone(),
            force_download: config.force_download,
            chunk_size_mib: config.chunk_size_mib,
        }
    }

    pub fn with_force(mut self, force_download: bool) -> Self {
        self.force_download = force_download;
        self
    }

    pub fn with_chunk_size_mib(mut self, chunk_size_mib: i64) -> Self {
        self.chunk_size_mib = chunk_size_mib;
        self
    }

    pub fn save_dir(&self) -> PathBuf {
        self.storage_root.join(&self.destination_dir)
    }

    pub fn save_path(&self) -> PathBuf {
        self.save_dir().join(file_name_from_url(&self.url))
    }

    pub fn temp_path(&self) -> PathBuf {
        temp_path_for(&self.save_path())
    }

    pub fn chunk_size(&self) -> u64 {
        chunk_size_bytes(self.chunk_size_mib)
    }
}

/// 取 URL 路径的最后一段作为文件名（不含查询串）
pub fn file_name_from_url(url: &str) -> String {
    if let Ok(parsed) = Url::parse(url) {
        if let Some(name) = parsed.path_segments().and_then(|mut segments| segments.next_back()) {
            if !name.is_empty() {
                return name.to_string();
            }
        }
        return FALLBACK_FILE_NAME.to_string();
    }

    let without_query = url.split(['?', '#']).next().unwrap_or("");
    match without_query.rsplit('/').next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => FALLBACK_FILE_NAME.to_string(),
    }
}

/// 以追加方式写入一个分块：打开、写入、刷盘、关闭
pub fn append_chunk(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(data)?;
    file.flush()?;
    file.sync_data()?;
    Ok(())
}

/// 文件不存在时返回 `None`
pub fn file_size(path: &Path) -> Option<u64> {
    fs::metadata(path).ok().filter(|m| m.is_file()).map(|m| m.len())
}

pub fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_extraction() {
        assert_eq!(file_name_from_url("https://example.com/file.txt"), "file.txt");
        assert_eq!(file_name_from_url("https://example.com/path/to/file.zip?token=1"), "file.zip");
        assert_eq!(file_name_from_url("https://example.com/"), FALLBACK_FILE_NAME);
        assert_eq!(file_name_from_url("not a url/name.bin"), "name.bin");
        assert_eq!(file_name_from_url(""), FALLBACK_FILE_NAME);
    }

    #[test]
    fn test_task_paths() {
        let task = TaskConfig::new("https://example.com/pkg/big.bin", "/srv/storage", "games");
        assert_eq!(task.save_path(), PathBuf::from("/srv/storage/games/big.bin"));
        assert_eq!(task.temp_path(), PathBuf::from("/srv/storage/games/big.bin.cache"));
    }

    #[test]
    fn test_task_chunk_size() {
        let task = TaskConfig::new("https://example.com/a", ".", "");
        assert_eq!(task.chunk_size(), 2 * 1024 * 1024);
        assert_eq!(task.with_chunk_size_mib(8).chunk_size(), 8 * 1024 * 1024);
    }

    #[test]
    fn test_append_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.bin");
        append_chunk(&path, b"hello ").unwrap();
        append_chunk(&path, b"world").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"hello world");
        assert_eq!(file_size(&path), Some(11));
    }

    #[test]
    fn test_remove_if_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.bin");
        tokio_test::assert_ok!(remove_if_exists(&path));
        fs::write(&path, b"x").unwrap();
        tokio_test::assert_ok!(remove_if_exists(&path));
        assert_eq!(file_size(&path), None);
    }
}
