use actix::{Handler, MessageResult};

use crate::core::error::DownloadError;
use super::actor::DownloadTaskActor;
use super::messages::*;

impl Handler<Configure> for DownloadTaskActor {
    type Result = Result<(), DownloadError>;
    fn handle(&mut self, msg: Configure, _ctx: &mut Self::Context) -> Self::Result {
        if self.running {
            return Err(DownloadError::AlreadyRunning);
        }
        self.reconfigure(msg.0);
        Ok(())
    }
}

impl Handler<StartDownload> for DownloadTaskActor {
    type Result = Result<(), DownloadError>;
    fn handle(&mut self, _msg: StartDownload, ctx: &mut Self::Context) -> Self::Result {
        if self.config.url.trim().is_empty() {
            log::warn!("[task {}] 下载链接为空", self.id);
            return Err(DownloadError::invalid_config("下载链接为空"));
        }
        if self.running {
            return Err(DownloadError::AlreadyRunning);
        }
        let attempt = self.begin_attempt();
        log::info!("[task {}] 开始下载 {} -> {}", self.id, self.config.url, self.config.save_path().display());
        self.discover_size(ctx, attempt);
        Ok(())
    }
}

impl Handler<StopDownload> for DownloadTaskActor {
    type Result = ();
    fn handle(&mut self, _msg: StopDownload, _ctx: &mut Self::Context) {
        self.stop();
    }
}

impl Handler<Subscribe> for DownloadTaskActor {
    type Result = MessageResult<Subscribe>;
    fn handle(&mut self, _msg: Subscribe, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.events.subscribe())
    }
}

impl Handler<QueryStatus> for DownloadTaskActor {
    type Result = MessageResult<QueryStatus>;
    fn handle(&mut self, _msg: QueryStatus, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(TaskSnapshot {
            id: self.id,
            state: self.state,
            record: self.record.clone(),
            last_error: self.last_error.clone(),
            retryable: self.last_error_retryable,
        })
    }
}

impl Handler<FetchNextChunk> for DownloadTaskActor {
    type Result = ();
    fn handle(&mut self, msg: FetchNextChunk, ctx: &mut Self::Context) {
        self.fetch_next_chunk(ctx, msg.attempt);
    }
}
