//! 进程控制块

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;

use mm::UserSpace;

use super::Pid;
use crate::arch::UserContext;
use crate::ipc::HandleId;

/// 进程阻塞的原因，同时保存唤醒时完成操作所需的全部信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOn {
    /// 等待子进程退出，`status_addr` 为 0 表示不关心退出码
    Wait {
        /// 写回退出码的用户地址
        status_addr: usize,
    },
    /// 睡眠若干时钟滴答
    Delay {
        /// 剩余滴答数
        remaining: u64,
    },
    /// 等待锁
    Lock {
        /// 锁句柄
        lock: HandleId,
    },
    /// 在条件变量上等待，被唤醒后需重新获取 `lock`
    Cvar {
        /// 条件变量句柄
        cvar: HandleId,
        /// 关联的锁
        lock: HandleId,
    },
    /// 等待管道数据
    PipeRead {
        /// 管道句柄
        pipe: HandleId,
        /// 用户缓冲区
        buf: usize,
        /// 请求长度
        len: usize,
    },
    /// 等待管道空间
    PipeWrite {
        /// 管道句柄
        pipe: HandleId,
        /// 要写入的全部数据
        data: Vec<u8>,
        /// 已写入字节数
        written: usize,
    },
    /// 等待终端输入
    TtyRead {
        /// 终端号
        tty: usize,
        /// 用户缓冲区
        buf: usize,
        /// 请求长度
        len: usize,
    },
    /// 等待终端发送完成
    TtyWrite {
        /// 终端号
        tty: usize,
        /// 要发送的全部数据
        data: Vec<u8>,
        /// 已发送字节数
        sent: usize,
    },
}

/// 进程状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessState {
    /// 在就绪队列中
    Ready,
    /// 正在运行
    Running,
    /// 阻塞
    Blocked(BlockOn),
    /// 已退出，等待父进程回收
    Zombie(i32),
}

/// 进程控制块
#[derive(Debug)]
pub struct Pcb {
    /// 进程号
    pub pid: Pid,
    /// 父进程，孤儿且无人收养时为 `None`
    pub parent: Option<Pid>,
    /// 尚未回收的子进程（按创建顺序）
    pub children: Vec<Pid>,
    /// 已退出、等待回收的子进程（按退出顺序）
    pub exited: VecDeque<Pid>,
    /// 区域 1 地址空间
    pub space: UserSpace,
    /// 最近一次陷阱保存的用户上下文
    pub ctx: UserContext,
    /// 状态
    pub state: ProcessState,
    /// 程序名（仅用于日志）
    pub name: String,
}

impl Pcb {
    /// 创建一个就绪的进程
    pub fn new(pid: Pid, parent: Option<Pid>, name: String, space: UserSpace, ctx: UserContext) -> Self {
        Pcb {
            pid,
            parent,
            children: Vec::new(),
            exited: VecDeque::new(),
            space,
            ctx,
            state: ProcessState::Ready,
            name,
        }
    }

    /// 是否处于僵尸态
    pub fn is_zombie(&self) -> bool {
        matches!(self.state, ProcessState::Zombie(_))
    }

    /// 阻塞原因
    pub fn blocked_on(&self) -> Option<&BlockOn> {
        match &self.state {
            ProcessState::Blocked(reason) => Some(reason),
            _ => None,
        }
    }

    /// 阻塞原因（可写）
    pub fn blocked_on_mut(&mut self) -> Option<&mut BlockOn> {
        match &mut self.state {
            ProcessState::Blocked(reason) => Some(reason),
            _ => None,
        }
    }
}
