//! CLI: 命令行接口和参数解析模块
//!
//! ## 主要功能
//!
//! - 命令行参数解析和验证
//! - 配置文件路径管理
//! - URL 列表处理（命令行参数和文件）
//! - 配置文件编辑器集成
//!
//! ## 支持的命令
//!
//! - 基本下载：`chunkdown <url>`
//! - 批量下载：`chunkdown -f urls.txt`
//! - 编辑配置：`chunkdown -e`
//! - 指定配置：`chunkdown -c config.conf <url>`
//! - 强制重新下载：`chunkdown --force <url>`

use clap::Parser;
use std::env;
use std::fs;
use std::path::Path;
use crate::config::Config;
use crate::core::error::DownloadError;
use crate::utils::validator;

/// 获取平台默认配置文件路径
pub fn default_config_path() -> String {
    #[cfg(target_os = "windows")]
    {
        let appdata = env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        format!("{}/chunkdown/chunkdown.conf", appdata)
    }
    #[cfg(target_os = "macos")]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/Library/Application Support/chunkdown/chunkdown.conf", home)
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/.config/chunkdown/chunkdown.conf", home)
    }
}

/// 打开配置文件编辑器
pub fn open_config_in_editor(config_path: &str) {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("notepad").arg(config_path).status().ok();
    }
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg("-e").arg(config_path).status().ok();
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        // 优先 $EDITOR，其次 xdg-open，最后 nano
        let editor = env::var("EDITOR").unwrap_or_default();
        if !editor.is_empty() && std::process::Command::new(&editor).arg(config_path).status().is_ok() {
            return;
        }
        if std::process::Command::new("xdg-open").arg(config_path).status().is_err() {
            let _ = std::process::Command::new("nano").arg(config_path).status();
        }
    }
}

/// ChunkDown 命令行参数
///
/// 示例用法：
///   chunkdown https://example.com/file.zip
///   chunkdown -e  # 编辑配置文件
///   chunkdown -c /path/to/config.conf https://example.com/file.zip
///   chunkdown -s 8 --force https://example.com/file.zip
#[derive(Parser, Debug, Clone)]
#[command(
    name = "chunkdown",
    author = "panzhifu",
    version = env!("CARGO_PKG_VERSION"),
    about = "一个用 Rust 编写的分块断点续传下载器",
    long_about = "按固定大小的 Range 请求逐块下载文件，每块写入后保存进度，中断后再次运行即可续传。\n\n示例：\n  chunkdown https://example.com/file.zip\n  chunkdown -e\n  chunkdown -r /data -d isos https://example.com/a.iso\n  chunkdown --force https://example.com/file.zip\n"
)]
pub struct Args {
    /// 要下载的URL列表（可同时指定多个）
    #[arg(required = false, help = "要下载的URL列表，可以同时指定多个URL。")]
    pub urls: Vec<String>,

    /// 包含URL列表的文件路径
    #[arg(short, long, help = "包含URL列表的文件路径，每行一个URL，# 开头为注释。")]
    pub file: Option<String>,

    /// 配置文件路径，默认为平台推荐路径
    #[arg(short = 'c', long, default_value_t = default_config_path(), help = "配置文件路径，默认为平台推荐路径。")]
    pub config: String,

    /// 编辑配置文件（-e 或 --edit）
    #[arg(short = 'e', long = "edit", help = "用系统默认编辑器打开配置文件并退出。")]
    pub edit_config: bool,

    /// 存储根目录
    #[arg(long = "root", short = 'r', help = "存储根目录，覆盖配置文件中的 storage_root。")]
    pub storage_root: Option<String>,

    /// 相对根目录的下载目录
    #[arg(long, short = 'd', help = "相对存储根目录的下载目录，覆盖配置文件中的 download_dir。")]
    pub download_dir: Option<String>,

    /// 忽略已有进度
    #[arg(long, help = "忽略 .cache 进度文件，从头开始下载。")]
    pub force: bool,

    /// 分块大小（MiB）
    #[arg(long = "chunk-size-mib", short = 's', allow_negative_numbers = true, help = "每个范围请求的大小（MiB），<= 0 使用默认值 2。")]
    pub chunk_size_mib: Option<i64>,

    /// 日志级别
    #[arg(long = "log-level", help = "日志级别：error / warn / info / debug / trace。")]
    pub log_level: Option<String>,
}

impl Args {
    /// 解析命令行参数并加载、合并、校验配置
    pub fn parse_args() -> Result<(Self, Config), DownloadError> {
        Self::from_args(Args::parse())
    }

    pub fn from_args(args: Args) -> Result<(Self, Config), DownloadError> {
        if args.edit_config {
            // 先确保文件存在，编辑器打开的才不是空文件
            Config::load(&args.config)?;
            open_config_in_editor(&args.config);
            std::process::exit(0);
        }

        let mut config = Config::load(&args.config)
            .map_err(|e| DownloadError::invalid_config(format!("无法读取配置文件 {}: {}", args.config, e)))?;

        config.merge_from_args(&args);
        config.validate()?;

        Ok((args, config))
    }

    /// 合并命令行和文件中的URL
    pub fn get_urls(&self) -> Result<Vec<String>, DownloadError> {
        let mut urls = Vec::new();
        urls.extend_from_slice(&self.urls);

        if let Some(file_path) = &self.file {
            if !Path::new(file_path).exists() {
                return Err(DownloadError::invalid_config(format!("URL文件不存在: {}", file_path)));
            }
            let content = fs::read_to_string(file_path)?;

            // 按行读取URL，忽略空行和注释
            for line in content.lines() {
                let line = line.trim();
                if !line.is_empty() && !line.starts_with('#') {
                    urls.push(line.to_string());
                }
            }
        }

        if urls.is_empty() {
            return Err(DownloadError::invalid_url("未提供任何URL。请通过命令行参数或文件提供至少一个URL。"));
        }

        validator::validate_urls(&urls).map_err(|e| DownloadError::invalid_url(e.to_string()))?;

        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::try_parse_from(["chunkdown", "https://example.com/file.zip"]).unwrap();
        assert_eq!(args.urls, vec!["https://example.com/file.zip"]);
        assert!(!args.force);
        assert!(args.chunk_size_mib.is_none());
        assert!(args.storage_root.is_none());
    }

    #[test]
    fn test_all_options() {
        let args = Args::try_parse_from([
            "chunkdown", "-c", "my.conf", "-r", "/data", "-d", "isos", "--force",
            "-s", "-1", "--log-level", "debug", "https://example.com/a.iso",
        ])
        .unwrap();
        assert_eq!(args.config, "my.conf");
        assert_eq!(args.storage_root.as_deref(), Some("/data"));
        assert_eq!(args.download_dir.as_deref(), Some("isos"));
        assert!(args.force);
        assert_eq!(args.chunk_size_mib, Some(-1));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_config_loading() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("chunkdown.conf");
        let mut saved = Config::default();
        saved.timeout = 5;
        saved.save_with_tutorial(conf.to_str().unwrap()).unwrap();

        let args = Args::try_parse_from([
            "chunkdown", "-c", conf.to_str().unwrap(), "-s", "4", "https://example.com/file.zip",
        ])
        .unwrap();
        let (_, config) = Args::from_args(args).unwrap();
        assert_eq!(config.timeout, 5);
        assert_eq!(config.chunk_size_mib, 4);
    }

    #[test]
    fn test_invalid_merged_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("chunkdown.conf");
        let args = Args::try_parse_from([
            "chunkdown", "-c", conf.to_str().unwrap(), "-s", "4096", "https://example.com/file.zip",
        ])
        .unwrap();
        assert!(matches!(Args::from_args(args), Err(DownloadError::InvalidConfig(_))));
    }

    #[test]
    fn test_url_file_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("urls.txt");
        fs::write(&list, "# 这是一个注释\nhttps://example.com/file1.zip\n\nhttps://example.com/file2.zip\n").unwrap();

        let args = Args::try_parse_from(["chunkdown", "-f", list.to_str().unwrap()]).unwrap();
        let urls = args.get_urls().unwrap();
        assert_eq!(urls, vec!["https://example.com/file1.zip", "https://example.com/file2.zip"]);
    }

    #[test]
    fn test_missing_or_invalid_urls() {
        let args = Args::try_parse_from(["chunkdown"]).unwrap();
        assert!(matches!(args.get_urls(), Err(DownloadError::InvalidUrl(_))));

        let args = Args::try_parse_from(["chunkdown", "not-a-url"]).unwrap();
        assert!(matches!(args.get_urls(), Err(DownloadError::InvalidUrl(_))));

        let args = Args::try_parse_from(["chunkdown", "-f", "/definitely/missing/urls.txt"]).unwrap();
        assert!(matches!(args.get_urls(), Err(DownloadError::InvalidConfig(_))));
    }
}
