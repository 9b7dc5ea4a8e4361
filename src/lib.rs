//! ChunkDown: 基于 actix 的分块断点续传下载器
//!
//! 每个下载任务是一个 [`DownloadTaskActor`](core::task::DownloadTaskActor)：
//! 先 HEAD 获取文件大小，再按固定大小的 Range 请求逐块追加到目标文件，
//! 每块写入后把进度保存到同目录的 `.cache` 文件，中断后可以从上次的位置继续。

pub mod cli;
pub mod config;
pub mod core;
pub mod ui;
pub mod utils;
