//! 共享任务队列与取消信号
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::types::FileTask;

/// 获取锁；worker panic 导致的中毒不影响队列/计数的一致性，直接恢复
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct QueueState {
    tasks: VecDeque<FileTask>,
    stopped: bool,
}

/// 单锁 + 唤醒条件保护的任务队列
///
/// 生产者模型是“封闭”的：`fill` 在 worker 启动前一次性完成，之后不再追加。
/// worker 与协调者共用同一个条件变量：队列变空、停止信号、放弃剩余任务
/// 都会 `notify_all`。
#[derive(Debug, Default)]
pub(crate) struct WorkQueue {
    state: Mutex<QueueState>,
    wake: Condvar,
}

impl WorkQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 一次性装入全部任务，返回队列长度
    pub(crate) fn fill(&self, tasks: impl IntoIterator<Item = FileTask>) -> usize {
        let mut state = lock(&self.state);
        state.tasks.extend(tasks);
        state.tasks.len()
    }

    /// 取出一个任务；队列为空时：已停止则返回 None，否则等待唤醒
    /// 调用方拿到任务时锁已释放
    pub(crate) fn pop(&self) -> Option<FileTask> {
        let mut state = lock(&self.state);
        loop {
            if let Some(task) = state.tasks.pop_front() {
                if state.tasks.is_empty() {
                    self.wake.notify_all();
                }
                return Some(task);
            }
            if state.stopped {
                return None;
            }
            state = self.wake.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// 阻塞直到队列为空（不代表在途任务已完成，完成以 join 为准）
    pub(crate) fn wait_drained(&self) {
        let mut state = lock(&self.state);
        while !state.tasks.is_empty() {
            state = self.wake.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// 设置停止信号并唤醒所有等待者
    pub(crate) fn stop(&self) {
        lock(&self.state).stopped = true;
        self.wake.notify_all();
    }

    /// 丢弃尚未领取的任务并停止，返回丢弃数量
    pub(crate) fn abandon(&self) -> usize {
        let dropped = {
            let mut state = lock(&self.state);
            let n = state.tasks.len();
            state.tasks.clear();
            state.stopped = true;
            n
        };
        self.wake.notify_all();
        dropped
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock(&self.state).tasks.len()
    }
}

/// 可克隆的取消信号；置位后 worker 不再领取新任务，在途任务照常完成
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    fn tasks(n: usize) -> Vec<FileTask> {
        (0..n).map(|i| FileTask::new(format!("/f/{i}"))).collect()
    }

    #[test]
    fn preserves_fill_order() {
        let q = WorkQueue::new();
        assert_eq!(q.fill(tasks(3)), 3);
        q.stop();
        let got: Vec<_> = std::iter::from_fn(|| q.pop()).map(|t| t.path().to_path_buf()).collect();
        assert_eq!(got, tasks(3).into_iter().map(|t| t.path().to_path_buf()).collect::<Vec<_>>());
    }

    #[test]
    fn every_task_claimed_exactly_once() {
        let q = WorkQueue::new();
        q.fill(tasks(1000));
        let claimed = Mutex::new(Vec::new());
        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    while let Some(t) = q.pop() {
                        lock(&claimed).push(t.path().to_path_buf());
                    }
                });
            }
            q.wait_drained();
            q.stop();
        });
        let claimed = claimed.into_inner().unwrap();
        assert_eq!(claimed.len(), 1000);
        assert_eq!(claimed.iter().collect::<HashSet<_>>().len(), 1000);
    }

    #[test]
    fn stop_releases_idle_workers() {
        let q = WorkQueue::new();
        let exited = AtomicUsize::new(0);
        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    assert!(q.pop().is_none());
                    exited.fetch_add(1, Ordering::SeqCst);
                });
            }
            q.stop();
        });
        assert_eq!(exited.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn abandon_drops_pending_tasks() {
        let q = WorkQueue::new();
        q.fill(tasks(5));
        assert!(q.pop().is_some());
        assert_eq!(q.abandon(), 4);
        assert_eq!(q.len(), 0);
        assert!(q.pop().is_none());
        q.wait_drained();
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let a = CancelToken::new();
        let b = a.clone();
        assert!(!b.is_cancelled());
        a.cancel();
        assert!(b.is_cancelled());
    }
}
