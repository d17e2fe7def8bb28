//! 内核锁

use alloc::collections::VecDeque;

use crate::error::{KernelError, KernelResult};
use crate::kernel::task::Pid;

/// 获取锁的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// 已成为持有者
    Acquired,
    /// 已进入等待队列
    Queued,
}

/// 内核锁
///
/// 释放时所有权直接交给等待队列队首，不存在“释放后被别人抢先”的窗口。
#[derive(Debug, Default)]
pub struct KernelLock {
    owner: Option<Pid>,
    waiters: VecDeque<Pid>,
}

impl KernelLock {
    /// 创建一个未被持有的锁
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前持有者
    pub fn owner(&self) -> Option<Pid> {
        self.owner
    }

    /// 等待者（按到达顺序）
    pub fn waiters(&self) -> impl Iterator<Item = Pid> + '_ {
        self.waiters.iter().copied()
    }

    /// 尝试获取锁，被占用时排队
    pub fn acquire(&mut self, pid: Pid) -> AcquireOutcome {
        if self.owner.is_none() {
            self.owner = Some(pid);
            AcquireOutcome::Acquired
        } else {
            self.waiters.push_back(pid);
            AcquireOutcome::Queued
        }
    }

    /// 释放锁，返回接手的新持有者
    pub fn release(&mut self, pid: Pid) -> KernelResult<Option<Pid>> {
        if self.owner != Some(pid) {
            return Err(KernelError::NotOwner);
        }
        self.owner = self.waiters.pop_front();
        Ok(self.owner)
    }

    /// 是否被持有或有人等待
    pub fn is_busy(&self) -> bool {
        self.owner.is_some() || !self.waiters.is_empty()
    }

    /// 从等待队列移除进程
    pub fn remove_waiter(&mut self, pid: Pid) -> bool {
        let before = self.waiters.len();
        self.waiters.retain(|&p| p != pid);
        before != self.waiters.len()
    }
}
