use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::core::task::{ProgressEvent, TaskEvent, TaskState};

const BAR_TEMPLATE: &str =
    "{prefix:.bold} [{bar:30.cyan/blue}] {bytes}/{total_bytes} {binary_bytes_per_sec} ETA:{eta} {msg}";

// 结构体：ProgressManager
// 每个下载任务一条进度条，由任务事件驱动
pub struct ProgressManager {
    multi: MultiProgress,
    progress_bars: Vec<ProgressBar>,
    states: Vec<TaskState>,
}

impl ProgressManager {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// 不输出到终端，用于测试或非交互环境
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        ProgressManager {
            multi: MultiProgress::with_draw_target(target),
            progress_bars: Vec::new(),
            states: Vec::new(),
        }
    }

    // 添加进度条，返回索引
    pub fn add_progress_bar(&mut self, name: &str) -> usize {
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        let pb = self.multi.add(ProgressBar::new(0));
        pb.set_style(style);
        pb.set_prefix(name.to_string());
        pb.set_message(TaskState::Wait.to_string());
        self.progress_bars.push(pb);
        self.states.push(TaskState::Wait);
        self.progress_bars.len() - 1
    }

    /// 把任务事件应用到对应的进度条
    pub fn apply(&mut self, task_index: usize, event: &TaskEvent) {
        let pb = match self.progress_bars.get(task_index) {
            Some(pb) => pb,
            None => return,
        };
        match event {
            TaskEvent::StateChanged(state) => {
                self.states[task_index] = *state;
                pb.set_message(state.to_string());
            }
            TaskEvent::Progress(progress) => {
                Self::update_progress(pb, progress);
                let state = self.states[task_index];
                if state.is_completed() {
                    pb.finish_with_message(state.to_string());
                } else if state.is_terminal() {
                    pb.abandon_with_message(state.to_string());
                }
            }
        }
    }

    fn update_progress(pb: &ProgressBar, progress: &ProgressEvent) {
        if progress.total_bytes > 0 {
            pb.set_length(progress.total_bytes);
        }
        pb.set_position(progress.bytes_downloaded);
    }

    pub fn state(&self, task_index: usize) -> Option<TaskState> {
        self.states.get(task_index).copied()
    }

    pub fn position(&self, task_index: usize) -> Option<u64> {
        self.progress_bars.get(task_index).map(|pb| pb.position())
    }

    /// 所有任务都进入终止状态
    pub fn all_finished(&self) -> bool {
        self.states.iter().all(|state| state.is_terminal())
    }

    pub fn println(&self, message: &str) {
        let _ = self.multi.println(message);
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}
