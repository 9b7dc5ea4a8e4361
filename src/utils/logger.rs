use chrono::Local; // 用于获取本地时间
use env_logger::{Builder, Target};
use log::LevelFilter; // 用于设置日志级别
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use crate::config::Config;

/// 根据配置初始化全局日志
///
/// `log_file` 为空时输出到 stderr，否则追加写入文件；
/// 文件超过 `log_max_size` 时先轮转为 `<log_file>.backup`。
pub fn init_logger(config: &Config) -> std::io::Result<()> {
    let level = LevelFilter::from_str(&config.log_level).unwrap_or(LevelFilter::Info);

    let mut builder = Builder::new();
    builder
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        });

    if !config.log_file.is_empty() {
        let path = Path::new(&config.log_file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        rotate_if_needed(path, config.log_max_size)?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    // 重复初始化（例如测试里）时忽略
    let _ = builder.try_init();
    Ok(())
}

/// 检查并执行日志轮转，返回是否发生了轮转
pub fn rotate_if_needed(path: &Path, max_size: u64) -> std::io::Result<bool> {
    let size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(_) => return Ok(false),
    };
    if size <= max_size {
        return Ok(false);
    }

    let backup_path = format!("{}.backup", path.display());
    if Path::new(&backup_path).exists() {
        fs::remove_file(&backup_path)?;
    }
    fs::rename(path, &backup_path)?;
    Ok(true)
}
