use actix::prelude::*;
use std::rc::Rc;
use uuid::Uuid;

use crate::core::error::DownloadError;
use super::events::EventBus;
use super::messages::FetchNextChunk;
use super::planner::{self, ByteRange, ResumeAction};
use super::record::{DownloadRecord, ProgressStore};
use super::state::TaskState;
use super::transport::{HeadResponse, HttpTransport, RangeResponse};
use super::util::{self, TaskConfig};

/// 单任务 Actor。
///
/// 所有 HTTP 回调都在 actor 上下文里串行执行，同一时刻最多一个请求在途。
/// 每次 start 会开启新的 attempt，过期 attempt 或 Stop 状态下到达的响应直接丢弃。
pub struct DownloadTaskActor {
    pub id: Uuid,
    pub config: TaskConfig,
    pub state: TaskState,
    pub record: DownloadRecord,
    pub last_error: Option<String>,
    /// 上一次失败是否值得直接重试
    pub last_error_retryable: bool,
    pub(crate) attempt: u64,
    pub(crate) running: bool,
    pub(crate) events: EventBus,
    transport: Rc<dyn HttpTransport>,
}

impl Actor for DownloadTaskActor {
    type Context = Context<Self>;
}

impl DownloadTaskActor {
    pub fn new(config: TaskConfig, transport: Rc<dyn HttpTransport>) -> Self {
        let record = DownloadRecord::new(&config.url, &config.save_path());
        Self {
            id: Uuid::new_v4(),
            config,
            state: TaskState::Wait,
            record,
            last_error: None,
            last_error_retryable: false,
            attempt: 0,
            running: false,
            events: EventBus::new(),
            transport,
        }
    }

    pub(crate) fn change_state(&mut self, state: TaskState) {
        if self.state != state {
            log::info!("[task {}] 状态变更: {} -> {}", self.id, self.state, state);
        }
        self.state = state;
        self.events.emit_transition(state, &self.record);
    }

    /// 只有当前 attempt 且未被停止时，回调才允许继续推进
    fn is_current(&self, attempt: u64) -> bool {
        attempt == self.attempt && self.running && self.state != TaskState::Stop
    }

    pub(crate) fn reconfigure(&mut self, config: TaskConfig) {
        self.record = DownloadRecord::new(&config.url, &config.save_path());
        self.config = config;
        self.last_error = None;
        self.last_error_retryable = false;
        self.change_state(TaskState::Wait);
    }

    pub(crate) fn begin_attempt(&mut self) -> u64 {
        self.attempt += 1;
        self.running = true;
        self.last_error = None;
        self.last_error_retryable = false;
        self.attempt
    }

    pub(crate) fn stop(&mut self) {
        self.running = false;
        self.change_state(TaskState::Stop);
    }

    fn fail(&mut self, error: DownloadError) {
        if error.is_fatal() {
            log::error!("[task {}] 下载失败, 无法自动恢复: {}", self.id, error);
        } else {
            log::warn!("[task {}] 下载失败: {}", self.id, error);
        }
        self.last_error = Some(error.to_string());
        self.last_error_retryable = error.is_retryable();
        self.running = false;
        self.change_state(TaskState::Error);
    }

    fn complete(&mut self) {
        self.record.mark_completed();
        self.persist();
        self.running = false;
        self.change_state(TaskState::Completed);
    }

    /// 保存失败不影响当前下载，只是丢失崩溃后的续传能力
    fn persist(&self) {
        if let Err(e) = ProgressStore::save(&self.record) {
            log::warn!("[task {}] {}", self.id, e);
        }
    }

    /// 第一步：HEAD 获取远端大小
    pub(crate) fn discover_size(&mut self, ctx: &mut Context<Self>, attempt: u64) {
        let transport = Rc::clone(&self.transport);
        let url = self.config.url.clone();
        log::debug!("[task {}] HEAD {}", self.id, url);
        ctx.spawn(
            async move { transport.head(&url).await }
                .into_actor(self)
                .map(move |result, act, ctx| act.on_head_completed(ctx, attempt, result)),
        );
    }

    fn on_head_completed(
        &mut self,
        ctx: &mut Context<Self>,
        attempt: u64,
        result: Result<HeadResponse, DownloadError>,
    ) {
        if !self.is_current(attempt) {
            log::debug!("[task {}] 丢弃过期的 HEAD 响应 (attempt {})", self.id, attempt);
            return;
        }

        let head = match result {
            Ok(head) => head,
            Err(e) => return self.fail(e),
        };
        if !head.is_success() {
            return self.fail(DownloadError::DiscoveryFailed { status: head.status });
        }
        let remote_size = match head.content_length {
            Some(len) if len > 0 => len as u64,
            other => return self.fail(DownloadError::InvalidContentLength(other.unwrap_or(0))),
        };

        let save_path = self.config.save_path();
        let stored = ProgressStore::load(&self.config.temp_path());
        let action = planner::reconcile(
            remote_size,
            &self.config.url,
            stored.as_ref(),
            self.config.force_download,
            util::file_size(&save_path),
        );
        log::info!("[task {}] 远端大小 {} 字节, 决定: {:?}", self.id, remote_size, action);

        match action {
            ResumeAction::FreshStart => {
                self.record = DownloadRecord::new(&self.config.url, &save_path);
                self.record.reset(remote_size);
                // 旧文件删不掉就不能追加，否则磁盘内容会和进度对不上
                if let Err(e) = util::remove_if_exists(&save_path) {
                    log::warn!("[task {}] 删除旧文件失败 {}: {}", self.id, save_path.display(), e);
                    return self.fail(DownloadError::Io(e));
                }
                self.change_state(TaskState::Downloading);
                self.persist();
                self.fetch_next_chunk(ctx, attempt);
            }
            ResumeAction::AlreadyComplete => {
                self.record = DownloadRecord::new(&self.config.url, &save_path);
                self.record.total_bytes = remote_size;
                self.record.advance(remote_size);
                self.running = false;
                self.record.mark_completed();
                self.change_state(TaskState::Completed);
            }
            ResumeAction::Resume { offset } => {
                self.record = DownloadRecord::new(&self.config.url, &save_path);
                self.record.total_bytes = remote_size;
                self.record.advance(offset);
                self.change_state(TaskState::Downloading);
                self.fetch_next_chunk(ctx, attempt);
            }
        }
    }

    /// 请求下一块；没有剩余范围时直接完成
    pub(crate) fn fetch_next_chunk(&mut self, ctx: &mut Context<Self>, attempt: u64) {
        if !self.is_current(attempt) {
            return;
        }

        let range = match planner::next_range(
            self.record.bytes_downloaded,
            self.record.total_bytes,
            self.config.chunk_size(),
        ) {
            Ok(Some(range)) => range,
            Ok(None) => return self.complete(),
            Err(e) => return self.fail(e),
        };

        let transport = Rc::clone(&self.transport);
        let url = self.config.url.clone();
        log::debug!("[task {}] GET {} Range: {}", self.id, url, range.header_value());
        ctx.spawn(
            async move { transport.get_range(&url, range).await }
                .into_actor(self)
                .map(move |result, act, ctx| act.on_chunk_completed(ctx, attempt, range, result)),
        );
    }

    fn on_chunk_completed(
        &mut self,
        ctx: &mut Context<Self>,
        attempt: u64,
        range: ByteRange,
        result: Result<RangeResponse, DownloadError>,
    ) {
        if !self.is_current(attempt) {
            log::debug!("[task {}] 丢弃范围 {} 的响应, 任务已停止或已重启", self.id, range.header_value());
            return;
        }

        let body = match result.and_then(|response| response.into_chunk(range)) {
            Ok(body) => body,
            Err(e) => return self.fail(e),
        };

        if let Err(e) = util::append_chunk(&self.record.save_path, &body) {
            return self.fail(DownloadError::Io(e));
        }
        self.record.advance(body.len() as u64);
        self.persist();

        if self.record.is_complete() {
            self.complete();
        } else {
            self.change_state(TaskState::Downloading);
            ctx.notify(FetchNextChunk { attempt });
        }
    }
}
