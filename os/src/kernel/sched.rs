//! 轮转调度器
//!
//! 就绪队列严格 FIFO；idle 进程从不入队，只在队列为空时运行。
//! 睡眠中的进程按进入睡眠的顺序记录，时钟中断按这个顺序唤醒。

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use super::task::{IDLE_PID, Pid};

/// 调度器
#[derive(Debug)]
pub struct Scheduler {
    current: Pid,
    ready: VecDeque<Pid>,
    sleepers: Vec<Pid>,
}

impl Scheduler {
    /// 创建调度器，初始运行 idle
    pub fn new() -> Self {
        Scheduler {
            current: IDLE_PID,
            ready: VecDeque::new(),
            sleepers: Vec::new(),
        }
    }

    /// 正在运行的进程
    pub fn current(&self) -> Pid {
        self.current
    }

    /// 设置正在运行的进程
    pub fn set_current(&mut self, pid: Pid) {
        self.current = pid;
    }

    /// 加入就绪队列尾部，idle 与已在队列中的进程被忽略
    pub fn enqueue(&mut self, pid: Pid) {
        if pid == IDLE_PID || self.ready.contains(&pid) {
            return;
        }
        self.ready.push_back(pid);
    }

    /// 取出队首
    pub fn pick_next(&mut self) -> Option<Pid> {
        self.ready.pop_front()
    }

    /// 是否有就绪进程
    pub fn has_ready(&self) -> bool {
        !self.ready.is_empty()
    }

    /// 就绪队列（按调度顺序）
    pub fn ready(&self) -> impl Iterator<Item = Pid> + '_ {
        self.ready.iter().copied()
    }

    /// 记录一个睡眠的进程
    pub fn add_sleeper(&mut self, pid: Pid) {
        self.sleepers.push(pid);
    }

    /// 睡眠的进程（按进入睡眠的顺序）
    pub fn sleepers(&self) -> &[Pid] {
        &self.sleepers
    }

    /// 从睡眠列表中移除
    pub fn remove_sleeper(&mut self, pid: Pid) {
        self.sleepers.retain(|&p| p != pid);
    }

    /// 从所有队列中移除进程
    pub fn remove(&mut self, pid: Pid) {
        self.ready.retain(|&p| p != pid);
        self.remove_sleeper(pid);
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_never_queued() {
        let mut sched = Scheduler::new();
        sched.enqueue(IDLE_PID);
        assert!(!sched.has_ready());
        assert_eq!(sched.pick_next(), None);
    }

    #[test]
    fn test_fifo_without_duplicates() {
        let mut sched = Scheduler::new();
        sched.enqueue(3);
        sched.enqueue(1);
        sched.enqueue(3);
        sched.enqueue(2);
        assert_eq!(sched.ready().collect::<Vec<_>>(), alloc::vec![3, 1, 2]);
        sched.remove(1);
        assert_eq!(sched.pick_next(), Some(3));
        assert_eq!(sched.pick_next(), Some(2));
    }
}
