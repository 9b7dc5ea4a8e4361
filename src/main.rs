use actix::prelude::*;
use chunkdown::cli;
use chunkdown::core::task::{
    AwcTransport, DownloadTaskActor, HttpTransport, QueryStatus, StartDownload, StopDownload,
    Subscribe, TaskConfig, TaskEvent, TaskState,
};
use chunkdown::ui::{self, DownloadSummary, ProgressManager};
use chunkdown::utils::logger;
use crossterm::{
    cursor, execute, terminal,
    event::{self, Event, KeyCode, KeyModifiers},
};
use futures::stream::{self, LocalBoxStream, StreamExt};
use std::rc::Rc;
use std::time::{Duration, Instant};

const KEYBOARD_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[actix::main]
async fn main() -> anyhow::Result<()> {
    // 解析参数和配置
    let (args, config) = match cli::Args::parse_args() {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("参数解析失败: {}", e);
            std::process::exit(1);
        }
    };

    logger::init_logger(&config)?;
    log::info!("程序启动, 版本 {} (构建于 {})", env!("CARGO_PKG_VERSION"), env!("VERGEN_BUILD_DATE"));

    let urls = match args.get_urls() {
        Ok(urls) => urls,
        Err(e) => {
            log::error!("获取URL列表失败: {}", e);
            eprintln!("获取URL列表失败: {}", e);
            std::process::exit(1);
        }
    };

    log::info!("解析到的URLs: {:?}", urls);
    log::info!("配置文件路径: {}", args.config);
    log::info!("{}", config.get_summary());
    println!("{}", config.get_summary());

    let transport: Rc<dyn HttpTransport> = Rc::new(AwcTransport::from_config(&config));
    let mut progress = ProgressManager::new();
    let (tasks, events) = create_and_start_tasks(&config, &urls, &transport, &mut progress).await;

    if tasks.is_empty() {
        eprintln!("没有可下载的任务");
        std::process::exit(1);
    }

    println!("\n开始下载... (按 'q' 或 's' 停止，停止后再次运行即可续传)");
    log::info!("开始下载 {} 个任务", tasks.len());

    let started = Instant::now();
    run_download_loop(&tasks, events, &mut progress).await?;
    let summary = summarize(&tasks, &progress, started.elapsed()).await;

    println!("{}", summary);
    log::info!(
        "下载结束 - 成功: {}, 失败: {}, 已停止: {}",
        summary.success_count, summary.failed_count, summary.stopped_count
    );

    if summary.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}

/// 一个 URL 一个 actor；返回成功启动的任务和合并后的事件流
async fn create_and_start_tasks(
    config: &chunkdown::config::Config,
    urls: &[String],
    transport: &Rc<dyn HttpTransport>,
    progress: &mut ProgressManager,
) -> (Vec<Addr<DownloadTaskActor>>, LocalBoxStream<'static, (usize, TaskEvent)>) {
    let mut tasks = Vec::new();
    let mut streams = Vec::new();

    for url in urls {
        let task_config = TaskConfig::from_config(config, url);
        let save_path = task_config.save_path();
        let addr = DownloadTaskActor::new(task_config, Rc::clone(transport)).start();

        // 先订阅再启动，不漏掉第一批事件
        let rx = match addr.send(Subscribe).await {
            Ok(rx) => rx,
            Err(e) => {
                ui::print_error(&format!("创建下载任务失败: {} - {}", url, e));
                continue;
            }
        };

        match addr.send(StartDownload).await {
            Ok(Ok(())) => {
                let name = save_path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| url.clone());
                let index = progress.add_progress_bar(&name);
                log::info!("创建下载任务: {} -> {}", url, save_path.display());
                ui::print_success(&format!("创建下载任务: {}", save_path.display()));

                let events = stream::unfold(rx, |mut rx| async move {
                    rx.recv().await.map(|event| (event, rx))
                })
                .map(move |event| (index, event));
                streams.push(events.boxed_local());
                tasks.push(addr);
            }
            Ok(Err(e)) => {
                log::error!("启动下载任务失败: {} - {}", url, e);
                ui::print_error(&format!("启动下载任务失败: {} - {}", url, e));
            }
            Err(e) => {
                log::error!("发送启动消息失败: {} - {}", url, e);
                ui::print_error(&format!("发送启动消息失败: {} - {}", url, e));
            }
        }
    }

    (tasks, stream::select_all(streams).boxed_local())
}

/// 运行下载主循环：消费任务事件，并在原始模式下监听键盘
async fn run_download_loop(
    tasks: &[Addr<DownloadTaskActor>],
    mut events: LocalBoxStream<'static, (usize, TaskEvent)>,
    progress: &mut ProgressManager,
) -> anyhow::Result<()> {
    let interactive = terminal::enable_raw_mode().is_ok();
    if interactive {
        execute!(std::io::stdout(), cursor::Hide)?;
    } else {
        log::warn!("无法进入终端原始模式，键盘控制不可用");
    }

    let mut stop_requested = false;
    while !progress.all_finished() {
        tokio::select! {
            next = events.next() => match next {
                Some((index, event)) => progress.apply(index, &event),
                None => break,
            },
            _ = tokio::time::sleep(KEYBOARD_POLL_INTERVAL), if interactive => {
                if !stop_requested && stop_key_pressed()? {
                    stop_requested = true;
                    progress.println("正在停止所有下载任务...");
                    log::info!("用户停止所有下载任务");
                    for task in tasks {
                        task.do_send(StopDownload);
                    }
                }
            }
        }
    }

    // 恢复终端
    if interactive {
        execute!(std::io::stdout(), cursor::Show)?;
        terminal::disable_raw_mode()?;
    }
    Ok(())
}

fn stop_key_pressed() -> std::io::Result<bool> {
    while event::poll(Duration::ZERO)? {
        if let Event::Key(key) = event::read()? {
            let ctrl_c = key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
            let stop = matches!(key.code, KeyCode::Char('q' | 'Q' | 's' | 'S'));
            if ctrl_c || stop {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

async fn summarize(
    tasks: &[Addr<DownloadTaskActor>],
    progress: &ProgressManager,
    elapsed: Duration,
) -> DownloadSummary {
    let mut summary = DownloadSummary {
        total_files: tasks.len(),
        total_size: 0,
        elapsed_time: elapsed,
        success_count: 0,
        failed_count: 0,
        stopped_count: 0,
    };

    for (index, task) in tasks.iter().enumerate() {
        summary.total_size += progress.position(index).unwrap_or(0);
        match progress.state(index) {
            Some(TaskState::Completed) => summary.success_count += 1,
            Some(TaskState::Stop) => summary.stopped_count += 1,
            _ => {
                summary.failed_count += 1;
                if let Ok(status) = task.send(QueryStatus).await {
                    let hint = if status.retryable { " (可重新运行以续传)" } else { "" };
                    ui::print_error(&format!(
                        "{}: {}{}",
                        status.record.source_url,
                        status.last_error.unwrap_or_else(|| status.state.to_string()),
                        hint
                    ));
                }
            }
        }
    }
    summary
}
