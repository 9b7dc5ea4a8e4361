//! Core: 下载任务 actor、分块续传与错误处理等核心逻辑模块

pub mod error;
pub mod task;

pub use error::DownloadError;
pub use task::{
    Configure, DownloadTaskActor, ProgressEvent, QueryStatus, StartDownload, StopDownload,
    Subscribe, TaskConfig, TaskEvent, TaskState,
};
