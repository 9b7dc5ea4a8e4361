//! `task` 模块包含了与单个下载任务相关的所有逻辑
//!
//! 主要包括：
//! - `actor`: `DownloadTaskActor`，驱动 HEAD -> 分块 GET 的状态机
//! - `state`: 任务状态 `TaskState`
//! - `record`: 进度记录与 `.cache` 侧车文件
//! - `planner`: 分块范围计算与续传决策
//! - `transport`: HTTP 传输抽象与 awc 实现
//! - `events`: 状态/进度事件广播
//! - `messages` / `handlers`: Actor 消息及其处理器
//! - `util`: 任务配置与文件操作

pub mod actor;
pub mod events;
pub mod handlers;
pub mod messages;
pub mod planner;
pub mod record;
pub mod state;
pub mod transport;
pub mod util;

#[cfg(test)]
pub mod test_utils;

// 导出核心组件，方便外部使用
pub use actor::DownloadTaskActor;
pub use events::{ProgressEvent, TaskEvent};
pub use messages::{Configure, QueryStatus, StartDownload, StopDownload, Subscribe, TaskSnapshot};
pub use record::{DownloadRecord, ProgressStore};
pub use state::TaskState;
pub use transport::{AwcTransport, HttpTransport};
pub use util::TaskConfig;
