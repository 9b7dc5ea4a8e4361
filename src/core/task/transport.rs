//! HTTP 传输层。引擎只依赖 `HttpTransport`，保证同一任务同一时刻只有一个请求在途。

use async_trait::async_trait;
use awc::error::{PayloadError, SendRequestError};
use awc::http::header::{ACCEPT_ENCODING, CONTENT_LENGTH, CONTENT_RANGE, RANGE, USER_AGENT};
use bytes::Bytes;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

use crate::config::Config;
use crate::core::error::DownloadError;
use super::planner::ByteRange;

/// HEAD 响应中引擎关心的部分
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadResponse {
    pub status: u16,
    pub content_length: Option<i64>,
}

impl HeadResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// `Content-Range: bytes <start>-<end>/<total>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: u64,
    pub end: u64,
    pub total: Option<u64>,
}

impl ContentRange {
    pub fn parse(value: &str) -> Option<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let re = PATTERN.get_or_init(|| {
            Regex::new(r"^\s*bytes\s+(\d+)-(\d+)/(\d+|\*)\s*$").expect("Content-Range 正则无效")
        });
        let caps = re.captures(value)?;
        let start = caps[1].parse().ok()?;
        let end = caps[2].parse().ok()?;
        let total = caps[3].parse().ok();
        Some(ContentRange { start, end, total })
    }
}

/// 范围 GET 的响应
#[derive(Debug, Clone)]
pub struct RangeResponse {
    pub status: u16,
    pub content_range: Option<ContentRange>,
    pub body: Bytes,
}

impl RangeResponse {
    /// 校验响应并取出可以追加写入的数据。
    ///
    /// 206 按 `Content-Range` 核对起点，允许比请求更短但不允许更长；
    /// 200 只有在长度恰好等于请求范围时才接受，否则说明服务器忽略了 `Range`。
    pub fn into_chunk(self, requested: ByteRange) -> Result<Bytes, DownloadError> {
        let len = self.body.len() as u64;
        match self.status {
            206 => {
                if let Some(range) = self.content_range {
                    if range.start != requested.start {
                        return Err(DownloadError::RangeMismatch {
                            expected: requested.start,
                            actual: range.start,
                        });
                    }
                }
                if len == 0 {
                    return Err(DownloadError::EmptyBody);
                }
                if len > requested.len() {
                    return Err(DownloadError::SizeMismatch {
                        expected: requested.len(),
                        actual: len,
                    });
                }
                Ok(self.body)
            }
            200 => {
                if len == requested.len() {
                    Ok(self.body)
                } else if len == 0 {
                    Err(DownloadError::EmptyBody)
                } else {
                    Err(DownloadError::RangeNotSupported)
                }
            }
            status => Err(DownloadError::ServerError { status }),
        }
    }
}

#[async_trait(?Send)]
pub trait HttpTransport {
    /// 发送 HEAD 获取文件大小
    async fn head(&self, url: &str) -> Result<HeadResponse, DownloadError>;

    /// 发送带 `Range: bytes=<start>-<end>` 的 GET
    async fn get_range(&self, url: &str, range: ByteRange) -> Result<RangeResponse, DownloadError>;
}

/// 基于 awc 的实现
pub struct AwcTransport {
    client: awc::Client,
}

impl AwcTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Self {
        let client = awc::Client::builder()
            .timeout(timeout)
            .add_default_header((USER_AGENT, user_agent.to_string()))
            .finish();
        Self { client }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(Duration::from_secs(config.timeout), &config.user_agent)
    }
}

fn map_send_error(url: &str, error: SendRequestError) -> DownloadError {
    match error {
        SendRequestError::Url(_) => DownloadError::invalid_url(url),
        SendRequestError::Timeout => DownloadError::network(format!("请求超时: {}", url)),
        other => DownloadError::network(format!("{}: {}", url, other)),
    }
}

#[async_trait(?Send)]
impl HttpTransport for AwcTransport {
    async fn head(&self, url: &str) -> Result<HeadResponse, DownloadError> {
        let response = self.client.head(url)
            .insert_header((ACCEPT_ENCODING, "identity"))
            .send()
            .await
            .map_err(|e| map_send_error(url, e))?;

        let content_length = response.headers().get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<i64>().ok());

        Ok(HeadResponse {
            status: response.status().as_u16(),
            content_length,
        })
    }

    async fn get_range(&self, url: &str, range: ByteRange) -> Result<RangeResponse, DownloadError> {
        let mut response = self.client.get(url)
            .insert_header((RANGE, range.header_value()))
            .insert_header((ACCEPT_ENCODING, "identity"))
            .send()
            .await
            .map_err(|e| map_send_error(url, e))?;

        let status = response.status().as_u16();
        let content_range = response.headers().get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(ContentRange::parse);

        if !(200..300).contains(&status) {
            return Ok(RangeResponse { status, content_range, body: Bytes::new() });
        }

        // 最多只缓冲请求范围那么多数据，忽略 Range 的服务器在这里就会被拦下
        let limit = range.len();
        let body = response.body()
            .limit(limit as usize)
            .await
            .map_err(|e| match e {
                PayloadError::Overflow if status == 200 => DownloadError::RangeNotSupported,
                PayloadError::Overflow => DownloadError::BodyTooLarge { limit },
                other => DownloadError::network(format!("读取响应失败: {}", other)),
            })?;

        Ok(RangeResponse { status, content_range, body })
    }
}
