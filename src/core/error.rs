use thiserror::Error;
use std::io;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("配置错误: {0}")]
    InvalidConfig(String),

    #[error("无效的URL: {0}")]
    InvalidUrl(String),

    #[error("网络错误: {0}")]
    Network(String),

    #[error("获取文件信息失败: HTTP {status}")]
    DiscoveryFailed { status: u16 },

    #[error("无效的文件长度: {0}")]
    InvalidContentLength(i64),

    #[error("服务器错误: HTTP {status}")]
    ServerError { status: u16 },

    #[error("服务器不支持范围请求")]
    RangeNotSupported,

    #[error("返回范围不匹配: 预期起点 {expected}, 实际起点 {actual}")]
    RangeMismatch {
        expected: u64,
        actual: u64,
    },

    #[error("数据长度不匹配: 预期 {expected} 字节, 实际 {actual} 字节")]
    SizeMismatch {
        expected: u64,
        actual: u64,
    },

    #[error("服务器返回了空数据")]
    EmptyBody,

    #[error("响应体超过上限 {limit} 字节")]
    BodyTooLarge { limit: u64 },

    #[error("IO错误: {0}")]
    Io(#[from] io::Error),

    #[error("进度保存失败: {0}")]
    Persistence(String),

    #[error("序列化失败: {0}")]
    Serialization(String),

    #[error("任务正在下载中")]
    AlreadyRunning,
}

impl DownloadError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        DownloadError::InvalidConfig(msg.into())
    }

    pub fn invalid_url(url: impl Into<String>) -> Self {
        DownloadError::InvalidUrl(url.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        DownloadError::Network(msg.into())
    }

    /// 网络抖动和 5xx 之类的错误，调用方重新 start 大概率能成功
    pub fn is_retryable(&self) -> bool {
        match self {
            DownloadError::Network(_) | DownloadError::EmptyBody => true,
            DownloadError::DiscoveryFailed { status } | DownloadError::ServerError { status } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            _ => false,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DownloadError::InvalidConfig(_)
                | DownloadError::InvalidUrl(_)
                | DownloadError::RangeNotSupported
        )
    }
}

impl From<serde_json::Error> for DownloadError {
    fn from(error: serde_json::Error) -> Self {
        DownloadError::Serialization(error.to_string())
    }
}
