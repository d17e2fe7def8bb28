//! 条件变量

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::kernel::task::Pid;

/// 条件变量，只保存等待者；关联的锁记录在等待进程的阻塞原因中
#[derive(Debug, Default)]
pub struct CondVar {
    waiters: VecDeque<Pid>,
}

impl CondVar {
    /// 创建条件变量
    pub fn new() -> Self {
        Self::default()
    }

    /// 进入等待队列
    pub fn wait(&mut self, pid: Pid) {
        self.waiters.push_back(pid);
    }

    /// 取出队首等待者
    pub fn signal(&mut self) -> Option<Pid> {
        self.waiters.pop_front()
    }

    /// 按到达顺序取出全部等待者
    pub fn broadcast(&mut self) -> Vec<Pid> {
        self.waiters.drain(..).collect()
    }

    /// 是否有人等待
    pub fn is_busy(&self) -> bool {
        !self.waiters.is_empty()
    }

    /// 从等待队列移除进程
    pub fn remove_waiter(&mut self, pid: Pid) -> bool {
        let before = self.waiters.len();
        self.waiters.retain(|&p| p != pid);
        before != self.waiters.len()
    }
}
