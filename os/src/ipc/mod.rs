//! IPC（进程间通信）模块
//!
//! 本模块实现三类由句柄引用的内核对象：
//! - 锁：FIFO 等待队列，释放时直接把所有权交给队首；
//! - 条件变量：FIFO 等待队列，配合锁使用；
//! - 管道：有界字节缓冲区，读者/写者各自排队。
//!
//! 三类对象共用一张句柄表，句柄单调递增、永不复用，只能通过 Reclaim 销毁。
//! 这里只维护对象自身的状态；阻塞、唤醒和用户内存拷贝由 `kernel::syscall::ipc` 负责。

mod cvar;
mod lock;
mod pipe;

pub use cvar::*;
pub use lock::*;
pub use pipe::*;

use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::error::{KernelError, KernelResult};
use crate::kernel::task::Pid;

/// 内核对象句柄
pub type HandleId = usize;

/// 句柄表中的内核对象
#[derive(Debug)]
pub enum KernelObject {
    /// 锁
    Lock(KernelLock),
    /// 条件变量
    Cvar(CondVar),
    /// 管道
    Pipe(Pipe),
}

/// 句柄表
#[derive(Debug)]
pub struct HandleTable {
    objects: HashMap<HandleId, KernelObject>,
    next_id: HandleId,
}

impl HandleTable {
    /// 创建空句柄表，第一个句柄为 1
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            next_id: 1,
        }
    }

    /// 登记一个对象并返回新句柄
    pub fn insert(&mut self, object: KernelObject) -> HandleId {
        let id = self.next_id;
        self.next_id += 1;
        self.objects.insert(id, object);
        id
    }

    /// 查找对象
    pub fn get(&self, id: HandleId) -> KernelResult<&KernelObject> {
        self.objects.get(&id).ok_or(KernelError::UnknownHandle)
    }

    /// 删除对象
    pub fn remove(&mut self, id: HandleId) -> KernelResult<KernelObject> {
        self.objects.remove(&id).ok_or(KernelError::UnknownHandle)
    }

    /// 存活对象个数
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// 是否没有存活对象
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// 按句柄取锁
    pub fn lock(&self, id: HandleId) -> KernelResult<&KernelLock> {
        match self.objects.get(&id) {
            Some(KernelObject::Lock(lock)) => Ok(lock),
            _ => Err(KernelError::UnknownHandle),
        }
    }

    /// 按句柄取锁（可写）
    pub fn lock_mut(&mut self, id: HandleId) -> KernelResult<&mut KernelLock> {
        match self.objects.get_mut(&id) {
            Some(KernelObject::Lock(lock)) => Ok(lock),
            _ => Err(KernelError::UnknownHandle),
        }
    }

    /// 按句柄取条件变量（可写）
    pub fn cvar_mut(&mut self, id: HandleId) -> KernelResult<&mut CondVar> {
        match self.objects.get_mut(&id) {
            Some(KernelObject::Cvar(cvar)) => Ok(cvar),
            _ => Err(KernelError::UnknownHandle),
        }
    }

    /// 按句柄取管道（可写）
    pub fn pipe_mut(&mut self, id: HandleId) -> KernelResult<&mut Pipe> {
        match self.objects.get_mut(&id) {
            Some(KernelObject::Pipe(pipe)) => Ok(pipe),
            _ => Err(KernelError::UnknownHandle),
        }
    }

    /// 进程持有的锁（按句柄升序）
    pub fn locks_owned_by(&self, pid: Pid) -> Vec<HandleId> {
        let mut locks: Vec<HandleId> = self
            .objects
            .iter()
            .filter_map(|(&id, object)| match object {
                KernelObject::Lock(lock) if lock.owner() == Some(pid) => Some(id),
                _ => None,
            })
            .collect();
        locks.sort_unstable();
        locks
    }

    /// 从所有对象的等待队列中移除进程
    pub fn remove_waiter(&mut self, pid: Pid) {
        for object in self.objects.values_mut() {
            match object {
                KernelObject::Lock(lock) => {
                    lock.remove_waiter(pid);
                }
                KernelObject::Cvar(cvar) => {
                    cvar.remove_waiter(pid);
                }
                KernelObject::Pipe(pipe) => pipe.remove_waiter(pid),
            }
        }
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}
