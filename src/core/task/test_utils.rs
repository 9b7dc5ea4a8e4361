//! 测试用的内存 HTTP 传输层，以及等待事件流的辅助函数。

use async_trait::async_trait;
use bytes::Bytes;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Notify;

use crate::core::error::DownloadError;
use super::events::TaskEvent;
use super::planner::ByteRange;
use super::state::TaskState;
use super::transport::{ContentRange, HeadResponse, HttpTransport, RangeResponse};

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(10);

pub fn sample_content(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// 从内存内容提供 HEAD / 范围 GET，并记录每一个请求
pub struct FakeTransport {
    content: Vec<u8>,
    head_status: u16,
    content_length: Option<i64>,
    head_error: Option<String>,
    ignore_range: bool,
    heads: Cell<usize>,
    requests: RefCell<Vec<ByteRange>>,
    failures: RefCell<HashMap<usize, u16>>,
    holds: RefCell<HashMap<usize, Rc<Notify>>>,
}

impl FakeTransport {
    pub fn new(content: Vec<u8>) -> Self {
        let content_length = Some(content.len() as i64);
        FakeTransport {
            content,
            head_status: 200,
            content_length,
            head_error: None,
            ignore_range: false,
            heads: Cell::new(0),
            requests: RefCell::new(Vec::new()),
            failures: RefCell::new(HashMap::new()),
            holds: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_head_status(mut self, status: u16) -> Self {
        self.head_status = status;
        self
    }

    pub fn with_content_length(mut self, content_length: Option<i64>) -> Self {
        self.content_length = content_length;
        self
    }

    /// HEAD 在传输层失败（连接被拒、超时等）
    pub fn with_head_error(mut self, message: &str) -> Self {
        self.head_error = Some(message.to_string());
        self
    }

    /// 模拟不支持 Range 的服务器：总是 200 + 整个文件
    pub fn ignoring_range(mut self) -> Self {
        self.ignore_range = true;
        self
    }

    /// 第 `index` 个 GET（从 0 开始）返回 `status`
    pub fn fail_request(&self, index: usize, status: u16) {
        self.failures.borrow_mut().insert(index, status);
    }

    pub fn clear_failures(&self) {
        self.failures.borrow_mut().clear();
    }

    /// 第 `index` 个 GET 挂起，直到返回的 `Notify` 被唤醒
    pub fn hold_request(&self, index: usize) -> Rc<Notify> {
        let gate = Rc::new(Notify::new());
        self.holds.borrow_mut().insert(index, Rc::clone(&gate));
        gate
    }

    pub fn head_count(&self) -> usize {
        self.heads.get()
    }

    pub fn requests(&self) -> Vec<ByteRange> {
        self.requests.borrow().clone()
    }
}

#[async_trait(?Send)]
impl HttpTransport for FakeTransport {
    async fn head(&self, _url: &str) -> Result<HeadResponse, DownloadError> {
        self.heads.set(self.heads.get() + 1);
        if let Some(message) = &self.head_error {
            return Err(DownloadError::network(message.clone()));
        }
        Ok(HeadResponse {
            status: self.head_status,
            content_length: self.content_length,
        })
    }

    async fn get_range(&self, _url: &str, range: ByteRange) -> Result<RangeResponse, DownloadError> {
        let index = {
            let mut requests = self.requests.borrow_mut();
            requests.push(range);
            requests.len() - 1
        };

        let gate = self.holds.borrow().get(&index).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some(status) = self.failures.borrow().get(&index).copied() {
            return Ok(RangeResponse { status, content_range: None, body: Bytes::new() });
        }

        if self.ignore_range {
            return Ok(RangeResponse {
                status: 200,
                content_range: None,
                body: Bytes::copy_from_slice(&self.content),
            });
        }

        let start = (range.start as usize).min(self.content.len());
        let end = (range.end as usize + 1).min(self.content.len());
        Ok(RangeResponse {
            status: 206,
            content_range: Some(ContentRange {
                start: range.start,
                end: range.end,
                total: Some(self.content.len() as u64),
            }),
            body: Bytes::copy_from_slice(&self.content[start..end]),
        })
    }
}

/// 读取事件直到进入终止状态，返回期间收到的全部事件（含终止状态对应的进度事件）
pub async fn collect_until_terminal(rx: &mut UnboundedReceiver<TaskEvent>) -> (Vec<TaskEvent>, TaskState) {
    let mut events = Vec::new();
    let mut terminal = None;
    loop {
        let event = tokio::time::timeout(EVENT_TIMEOUT, rx.recv())
            .await
            .expect("等待事件超时")
            .expect("事件通道已关闭");
        let done = matches!(event, TaskEvent::Progress(_)) && terminal.is_some();
        if let TaskEvent::StateChanged(state) = &event {
            if state.is_terminal() {
                terminal = Some(*state);
            }
        }
        events.push(event);
        if done {
            return (events, terminal.unwrap());
        }
    }
}

/// 读取事件直到已下载字节数达到 `bytes`
pub async fn wait_for_bytes(rx: &mut UnboundedReceiver<TaskEvent>, bytes: u64) {
    loop {
        let event = tokio::time::timeout(EVENT_TIMEOUT, rx.recv())
            .await
            .expect("等待事件超时")
            .expect("事件通道已关闭");
        if let TaskEvent::Progress(progress) = event {
            if progress.bytes_downloaded >= bytes {
                return;
            }
        }
    }
}
