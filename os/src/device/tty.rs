//! 终端状态
//!
//! 每个终端维护：
//! - 已收到但尚未被读走的输入行；
//! - 阻塞的读者与写者（FIFO）；
//! - 至多一个正在进行的发送。

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::kernel::task::Pid;

/// 正在进行的发送
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transmission {
    /// 发起者
    pub pid: Pid,
    /// 本块长度
    pub len: usize,
}

/// 终端
#[derive(Debug, Default)]
pub struct Terminal {
    lines: VecDeque<Vec<u8>>,
    pub(crate) readers: VecDeque<Pid>,
    pub(crate) writers: VecDeque<Pid>,
    pub(crate) in_flight: Option<Transmission>,
}

impl Terminal {
    /// 创建终端
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存一行收到的输入
    pub fn push_line(&mut self, line: Vec<u8>) {
        self.lines.push_back(line);
    }

    /// 是否有未读输入
    pub fn has_input(&self) -> bool {
        !self.lines.is_empty()
    }

    /// 从最早的一行中取出至多 `max` 字节，剩余部分留待下次读取
    pub fn take_input(&mut self, max: usize) -> Vec<u8> {
        let Some(line) = self.lines.front_mut() else {
            return Vec::new();
        };
        let n = max.min(line.len());
        let taken: Vec<u8> = line.drain(..n).collect();
        if line.is_empty() {
            self.lines.pop_front();
        }
        taken
    }

    /// 从等待队列中移除进程
    pub fn remove_waiter(&mut self, pid: Pid) {
        self.readers.retain(|&p| p != pid);
        self.writers.retain(|&p| p != pid);
    }
}
