use serde::{Serialize, Deserialize};
use std::fmt;

/// 下载任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TaskState {
    #[default]
    Wait,
    Downloading,
    Completed,
    Stop,
    Error,
}

impl TaskState {
    /// 进入该状态后引擎不会再发起任何请求
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Stop | TaskState::Error)
    }

    pub fn is_completed(&self) -> bool {
        *self == TaskState::Completed
    }

    pub fn is_error(&self) -> bool {
        *self == TaskState::Error
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Wait => "等待",
            TaskState::Downloading => "下载中",
            TaskState::Completed => "已完成",
            TaskState::Stop => "已停止",
            TaskState::Error => "错误",
        };
        f.write_str(name)
    }
}
