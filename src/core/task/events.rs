use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use super::record::DownloadRecord;
use super::state::TaskState;

/// 进度通知
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub percent: f32,
    pub bytes_downloaded: u64,
    pub total_bytes: u64,
    pub is_completed: bool,
    pub is_error: bool,
}

impl ProgressEvent {
    pub fn from_record(record: &DownloadRecord, state: TaskState) -> Self {
        ProgressEvent {
            percent: record.percent,
            bytes_downloaded: record.bytes_downloaded,
            total_bytes: record.total_bytes,
            is_completed: state.is_completed(),
            is_error: state.is_error(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    StateChanged(TaskState),
    Progress(ProgressEvent),
}

/// 多播事件：每个订阅者一条无界通道，接收端被丢弃后自动移除
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<UnboundedSender<TaskEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> UnboundedReceiver<TaskEvent> {
        let (tx, rx) = unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn emit(&mut self, event: TaskEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// 每次状态变化都依次发出状态事件和进度事件
    pub fn emit_transition(&mut self, state: TaskState, record: &DownloadRecord) {
        self.emit(TaskEvent::StateChanged(state));
        self.emit(TaskEvent::Progress(ProgressEvent::from_record(record, state)));
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
