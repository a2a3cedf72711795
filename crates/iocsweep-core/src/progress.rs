//! 进度统计与终端进度条
use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::queue::lock;

/// 进度条字符宽度
pub const BAR_WIDTH: usize = 50;

/// 进度条显示方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressMode {
    /// 在 stderr 原地重绘（非终端时 indicatif 自动不绘制）
    #[default]
    Terminal,
    /// 不绘制，只计数
    Hidden,
}

/// (已完成, 总数)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressState {
    pub completed: usize,
    pub total: usize,
}

/// 线程安全的进度计数器；计数只在自身锁内单步递增
pub struct ProgressReporter {
    state: Mutex<ProgressState>,
    bar: ProgressBar,
}

impl ProgressReporter {
    pub fn new(total: usize, mode: ProgressMode) -> Self {
        let bar = match mode {
            ProgressMode::Terminal => ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr()),
            ProgressMode::Hidden => ProgressBar::hidden(),
        };
        // 文本由 render 生成，indicatif 只负责原地重绘
        if let Ok(style) = ProgressStyle::with_template("{msg}") {
            bar.set_style(style);
        }
        bar.set_message(render(0, total));
        Self { state: Mutex::new(ProgressState { completed: 0, total }), bar }
    }

    /// 完成一个任务：计数 +1 并重绘，返回更新后的状态
    pub fn advance(&self) -> ProgressState {
        let mut state = lock(&self.state);
        if state.completed < state.total {
            state.completed += 1;
        }
        self.bar.set_position(state.completed as u64);
        self.bar.set_message(render(state.completed, state.total));
        *state
    }

    pub fn snapshot(&self) -> ProgressState {
        *lock(&self.state)
    }

    /// 暂时擦除进度条执行 `f`（向同一终端写诊断信息时使用），之后重绘
    pub fn suspend<T>(&self, f: impl FnOnce() -> T) -> T {
        self.bar.suspend(f)
    }

    /// 保留最后一帧并换行
    pub fn finish(&self) {
        self.bar.finish();
    }
}

/// 固定宽度文本进度条，例如 `[#####     ] 10% (1/10)`
pub fn render(completed: usize, total: usize) -> String {
    let percent = if total == 0 { 0 } else { completed.min(total) * 100 / total };
    let filled = percent * BAR_WIDTH / 100;
    format!("[{}{}] {}% ({}/{})", "#".repeat(filled), " ".repeat(BAR_WIDTH - filled), percent, completed, total)
}
