use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use log::LevelFilter;
use crate::core::error::DownloadError;
use crate::utils::validator;

/// 配置结构体
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// 存储根目录
    pub storage_root: String,
    /// 相对存储根目录的下载目录，为空表示直接放在根目录下
    pub download_dir: String,
    /// 分块大小（MiB），<= 0 表示使用默认的 2 MiB
    pub chunk_size_mib: i64,
    /// 是否总是从头开始下载
    pub force_download: bool,
    /// 网络超时时间（秒）
    pub timeout: u64,
    /// User-Agent
    pub user_agent: String,
    /// 日志级别
    pub log_level: String,
    /// 日志文件，为空表示输出到 stderr
    pub log_file: String,
    /// 日志文件轮转阈值（字节）
    pub log_max_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_root: "./downloads".to_string(),
            download_dir: String::new(),
            chunk_size_mib: 2,
            force_download: false,
            timeout: 30,
            user_agent: format!("ChunkDown/{}", env!("CARGO_PKG_VERSION")),
            log_level: "info".to_string(),
            log_file: String::new(),
            log_max_size: 10 * 1024 * 1024,
        }
    }
}

impl Config {
    /// 加载配置文件，不存在或格式错误时写入默认配置
    pub fn load(path: &str) -> Result<Self, DownloadError> {
        if Path::new(path).exists() {
            let content = fs::read_to_string(path)?;
            match toml::from_str(&content) {
                Ok(config) => Ok(config),
                Err(e) => {
                    log::warn!("配置文件格式错误: {}，将使用默认配置", e);
                    let config = Config::default();
                    config.save_with_tutorial(path)?;
                    Ok(config)
                }
            }
        } else {
            let config = Config::default();
            config.save_with_tutorial(path)?;
            Ok(config)
        }
    }

    /// 保存带教程的配置文件（唯一写入方法）
    pub fn save_with_tutorial(&self, path: &str) -> Result<(), DownloadError> {
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent)?;
        }
        let config_content = toml::to_string_pretty(self)
            .map_err(|e| DownloadError::Serialization(format!("无法序列化配置: {}", e)))?;
        let full_content = format!("{}\n{}", Config::generate_tutorial_content(), config_content);
        fs::write(path, full_content)?;
        Ok(())
    }

    fn generate_tutorial_content() -> String {
        r#"# ChunkDown 配置文件
# ====================
#
# TOML 格式。命令行参数会覆盖这里的设置，优先级：命令行 > 配置文件 > 默认值
#
# 配置文件位置：
# - Windows: %APPDATA%/chunkdown/chunkdown.conf
# - macOS: ~/Library/Application Support/chunkdown/chunkdown.conf
# - Linux: ~/.config/chunkdown/chunkdown.conf
#
# 使用示例：
#   chunkdown https://example.com/file.zip                 # 使用默认配置
#   chunkdown -s 8 https://example.com/file.zip            # 每块 8 MiB
#   chunkdown --force https://example.com/file.zip         # 忽略已有进度，重新下载
#   chunkdown -r /data -d isos https://example.com/a.iso   # 保存到 /data/isos/a.iso
#   chunkdown -f urls.txt                                  # 批量下载，每行一个 URL
#   chunkdown -e                                           # 编辑本文件
#
# ==================== 配置项说明 ====================
#
# storage_root    存储根目录，支持相对路径和绝对路径
# download_dir    相对 storage_root 的子目录，留空表示直接保存在根目录下
# chunk_size_mib  每次范围请求的大小（MiB），<= 0 使用默认值 2，最大 1024
# force_download  true 时忽略 .cache 进度文件，总是从头下载
# timeout         单个 HTTP 请求的超时时间（秒）
# user_agent      请求头 User-Agent
# log_level       日志级别：error / warn / info / debug / trace
# log_file        日志文件路径，留空输出到终端
# log_max_size    日志文件超过该字节数时，启动时轮转为 <log_file>.backup
#
# ==================== 断点续传 ====================
#
# 下载过程中会在目标文件旁生成 <文件名>.cache 进度文件。
# 中断后再次运行相同的命令即可从上次的位置继续；
# 远端文件大小变化或本地文件被改动时会自动从头开始。
"#.to_string()
    }

    /// 校验配置合法性
    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.timeout == 0 {
            return Err(DownloadError::invalid_config("超时时间必须大于0"));
        }

        validator::validate_output_path(&self.storage_root)
            .map_err(|e| DownloadError::invalid_config(format!("存储根目录无效: {}", e)))?;

        validator::validate_chunk_size(self.chunk_size_mib)
            .map_err(|e| DownloadError::invalid_config(e.to_string()))?;

        if LevelFilter::from_str(&self.log_level).is_err() {
            return Err(DownloadError::invalid_config(format!("无效的日志级别: {}", self.log_level)));
        }

        Ok(())
    }

    /// 合并命令行参数到配置
    pub fn merge_from_args(&mut self, args: &crate::cli::Args) {
        if let Some(root) = &args.storage_root {
            self.storage_root = root.clone();
        }

        if let Some(dir) = &args.download_dir {
            self.download_dir = dir.clone();
        }

        if let Some(chunk_size_mib) = args.chunk_size_mib {
            self.chunk_size_mib = chunk_size_mib;
        }

        if args.force {
            self.force_download = true;
        }

        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
    }

    /// 获取配置摘要信息
    pub fn get_summary(&self) -> String {
        format!(
            "配置摘要:\n\
            - 存储根目录: {}\n\
            - 下载目录: {}\n\
            - 分块大小: {} MiB\n\
            - 强制重新下载: {}\n\
            - 超时时间: {} 秒\n\
            - 日志级别: {}",
            self.storage_root,
            if self.download_dir.is_empty() { "(根目录)" } else { &self.download_dir },
            if self.chunk_size_mib <= 0 { 2 } else { self.chunk_size_mib },
            if self.force_download { "是" } else { "否" },
            self.timeout,
            self.log_level,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.storage_root, "./downloads");
        assert_eq!(config.download_dir, "");
        assert_eq!(config.chunk_size_mib, 2);
        assert!(!config.force_download);
        assert_eq!(config.timeout, 30);
        assert!(config.user_agent.starts_with("ChunkDown/"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.timeout = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.chunk_size_mib = 2048;
        assert!(config.validate().is_err());

        config = Config::default();
        config.chunk_size_mib = 0;
        assert!(config.validate().is_ok());

        config = Config::default();
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_storage_root_must_be_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, b"x").unwrap();

        let mut config = Config::default();
        config.storage_root = file.display().to_string();
        assert!(matches!(config.validate(), Err(DownloadError::InvalidConfig(_))));

        config.storage_root = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunkdown.conf");
        let path = path.to_str().unwrap();

        let mut config = Config::default();
        config.chunk_size_mib = 8;
        config.download_dir = "isos".to_string();
        config.save_with_tutorial(path).expect("保存带教程的配置失败");

        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("ChunkDown 配置文件"));
        assert!(content.contains("断点续传"));

        let loaded = Config::load(path).expect("加载配置失败");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_creates_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chunkdown.conf");
        let path = path.to_str().unwrap();

        let config = Config::load(path).unwrap();
        assert_eq!(config, Config::default());
        assert!(Path::new(path).exists());
    }

    #[test]
    fn test_invalid_toml_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunkdown.conf");
        fs::write(&path, "timeout = \"soon\"\n[[[").unwrap();

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunkdown.conf");
        fs::write(&path, "chunk_size_mib = 4\n").unwrap();

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.chunk_size_mib, 4);
        assert_eq!(config.timeout, 30);
    }

    #[test]
    fn test_merge_from_args() {
        let args = crate::cli::Args::try_parse_from([
            "chunkdown", "-r", "/data", "-d", "isos", "-s", "4", "--force",
            "https://example.com/a.iso",
        ])
        .unwrap();
        let mut config = Config::default();
        config.merge_from_args(&args);

        assert_eq!(config.storage_root, "/data");
        assert_eq!(config.download_dir, "isos");
        assert_eq!(config.chunk_size_mib, 4);
        assert!(config.force_download);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_config_summary() {
        let summary = Config::default().get_summary();
        assert!(summary.contains("配置摘要"));
        assert!(summary.contains("存储根目录"));
        assert!(summary.contains("2 MiB"));
    }
}
