use actix::Message;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use crate::core::error::DownloadError;
use super::events::TaskEvent;
use super::record::DownloadRecord;
use super::state::TaskState;
use super::util::TaskConfig;

/// 重新配置任务，回到 Wait
pub struct Configure(pub TaskConfig);
impl Message for Configure { type Result = Result<(), DownloadError>; }

/// 开始（或重新开始）下载；URL 为空时直接返回配置错误
pub struct StartDownload;
impl Message for StartDownload { type Result = Result<(), DownloadError>; }

/// 软停止：不打断在途请求，但其结果会被丢弃
pub struct StopDownload;
impl Message for StopDownload { type Result = (); }

/// 订阅状态与进度事件
pub struct Subscribe;
impl Message for Subscribe { type Result = UnboundedReceiver<TaskEvent>; }

/// 查询任务快照
pub struct QueryStatus;
impl Message for QueryStatus { type Result = TaskSnapshot; }

#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    pub id: Uuid,
    pub state: TaskState,
    pub record: DownloadRecord,
    pub last_error: Option<String>,
    /// 网络抖动、5xx 之类的失败，重新 start 大概率能成功
    pub retryable: bool,
}

/// 内部消息：上一块已写入并保存进度，请求下一块
#[doc(hidden)]
pub struct FetchNextChunk {
    pub attempt: u64,
}
impl Message for FetchNextChunk { type Result = (); }
