//! 锁、条件变量、管道与 Reclaim

use alloc::vec::Vec;

use super::{Outcome, length_arg};
use crate::error::{KernelError, KernelResult};
use crate::ipc::{AcquireOutcome, CondVar, HandleId, KernelLock, KernelObject, Pipe};
use crate::kernel::Kernel;
use crate::kernel::task::{BlockOn, Pid, ProcessState};

impl Kernel {
    // ========================================================================
    // 锁
    // ========================================================================

    pub(crate) fn sys_lock_init(&mut self) -> KernelResult<Outcome> {
        let id = self.objects.insert(KernelObject::Lock(KernelLock::new()));
        log::debug!("ipc: lock {} created", id);
        Ok(Outcome::Return(id as i64))
    }

    pub(crate) fn sys_acquire(&mut self, id: HandleId) -> KernelResult<Outcome> {
        let pid = self.current_pid();
        let lock = self.objects.lock_mut(id)?;
        if lock.owner() == Some(pid) {
            return Err(KernelError::InvalidArgument);
        }
        match lock.acquire(pid) {
            AcquireOutcome::Acquired => Ok(Outcome::Return(0)),
            AcquireOutcome::Queued => {
                self.block_current(BlockOn::Lock { lock: id });
                Ok(Outcome::Blocked)
            }
        }
    }

    pub(crate) fn sys_release(&mut self, id: HandleId) -> KernelResult<Outcome> {
        let pid = self.current_pid();
        if let Some(next) = self.objects.lock_mut(id)?.release(pid)? {
            self.wake(next, 0);
        }
        Ok(Outcome::Return(0))
    }

    /// 替已退出的持有者释放锁
    pub(crate) fn unlock(&mut self, id: HandleId, owner: Pid) {
        if let Ok(Some(next)) = self.objects.lock_mut(id).and_then(|lock| lock.release(owner)) {
            self.wake(next, 0);
        }
    }

    // ========================================================================
    // 条件变量
    // ========================================================================

    pub(crate) fn sys_cvar_init(&mut self) -> KernelResult<Outcome> {
        let id = self.objects.insert(KernelObject::Cvar(CondVar::new()));
        log::debug!("ipc: cvar {} created", id);
        Ok(Outcome::Return(id as i64))
    }

    pub(crate) fn sys_cvar_wait(&mut self, cvar: HandleId, lock: HandleId) -> KernelResult<Outcome> {
        let pid = self.current_pid();
        self.objects.cvar_mut(cvar)?;
        let next = self.objects.lock_mut(lock)?.release(pid)?;
        self.objects.cvar_mut(cvar)?.wait(pid);
        if let Some(next) = next {
            self.wake(next, 0);
        }
        self.block_current(BlockOn::Cvar { cvar, lock });
        Ok(Outcome::Blocked)
    }

    pub(crate) fn sys_cvar_signal(&mut self, cvar: HandleId) -> KernelResult<Outcome> {
        if let Some(pid) = self.objects.cvar_mut(cvar)?.signal() {
            self.reacquire(pid);
        }
        Ok(Outcome::Return(0))
    }

    pub(crate) fn sys_cvar_broadcast(&mut self, cvar: HandleId) -> KernelResult<Outcome> {
        for pid in self.objects.cvar_mut(cvar)?.broadcast() {
            self.reacquire(pid);
        }
        Ok(Outcome::Return(0))
    }

    /// 被通知的等待者转去排队获取关联的锁，拿到锁后才回到就绪态
    fn reacquire(&mut self, pid: Pid) {
        let Some(BlockOn::Cvar { lock, .. }) = self.procs.get(&pid).and_then(|p| p.blocked_on())
        else {
            return;
        };
        let lock = *lock;
        match self.objects.lock_mut(lock).map(|l| l.acquire(pid)) {
            Ok(AcquireOutcome::Acquired) => self.wake(pid, 0),
            Ok(AcquireOutcome::Queued) => {
                self.pcb_mut(pid).state = ProcessState::Blocked(BlockOn::Lock { lock });
            }
            Err(e) => self.wake(pid, e.to_errno()),
        }
    }

    // ========================================================================
    // 管道
    // ========================================================================

    pub(crate) fn sys_pipe_init(&mut self) -> KernelResult<Outcome> {
        let id = self
            .objects
            .insert(KernelObject::Pipe(Pipe::new(self.config.pipe_capacity)));
        log::debug!("ipc: pipe {} created", id);
        Ok(Outcome::Return(id as i64))
    }

    pub(crate) fn sys_pipe_read(&mut self, id: HandleId, buf: usize, len: i64) -> KernelResult<Outcome> {
        let pid = self.current_pid();
        let len = length_arg(len)?;
        let available = self.objects.pipe_mut(id)?.available();
        if len == 0 {
            return Ok(Outcome::Return(0));
        }
        if available > 0 {
            let n = len.min(available);
            self.probe_user(pid, buf, n)?;
            let data = self.objects.pipe_mut(id)?.read(n);
            self.copy_to_user(pid, buf, &data)?;
            self.pump_pipe(id);
            return Ok(Outcome::Return(n as i64));
        }

        self.probe_user(pid, buf, len)?;
        self.objects.pipe_mut(id)?.readers_mut().push_back(pid);
        self.block_current(BlockOn::PipeRead { pipe: id, buf, len });
        Ok(Outcome::Blocked)
    }

    pub(crate) fn sys_pipe_write(&mut self, id: HandleId, buf: usize, len: i64) -> KernelResult<Outcome> {
        let pid = self.current_pid();
        let len = length_arg(len)?;
        self.objects.pipe_mut(id)?;
        if len == 0 {
            return Ok(Outcome::Return(0));
        }
        let data = self.copy_from_user(pid, buf, len)?;

        let pipe = self.objects.pipe_mut(id)?;
        // 已有写者排队时不能插队
        let written = if pipe.writers().is_empty() {
            pipe.write(&data)
        } else {
            0
        };
        if written == len {
            self.pump_pipe(id);
            return Ok(Outcome::Return(len as i64));
        }

        pipe.writers_mut().push_back(pid);
        self.block_current(BlockOn::PipeWrite {
            pipe: id,
            data,
            written,
        });
        self.pump_pipe(id);
        Ok(Outcome::Blocked)
    }

    /// 反复服务阻塞的读者和写者，直到双方都无法前进
    fn pump_pipe(&mut self, id: HandleId) {
        loop {
            let mut progressed = false;

            loop {
                let Ok(pipe) = self.objects.pipe_mut(id) else {
                    return;
                };
                if pipe.available() == 0 {
                    break;
                }
                let Some(reader) = pipe.readers_mut().pop_front() else {
                    break;
                };
                let Some(BlockOn::PipeRead { buf, len, .. }) =
                    self.procs.get(&reader).and_then(|p| p.blocked_on())
                else {
                    continue;
                };
                let (buf, len) = (*buf, *len);
                let data = pipe.read(len);
                let ret = match self.copy_to_user(reader, buf, &data) {
                    Ok(()) => data.len() as i64,
                    Err(e) => {
                        log::warn!("ipc: pipe {} lost {} bytes for pid {}: {}", id, data.len(), reader, e);
                        e.to_errno()
                    }
                };
                self.wake(reader, ret);
                progressed = true;
            }

            loop {
                let Ok(pipe) = self.objects.pipe_mut(id) else {
                    return;
                };
                if pipe.space() == 0 {
                    break;
                }
                let Some(&writer) = pipe.writers().front() else {
                    break;
                };
                let Some(ProcessState::Blocked(BlockOn::PipeWrite { data, written, .. })) =
                    self.procs.get_mut(&writer).map(|p| &mut p.state)
                else {
                    pipe.writers_mut().pop_front();
                    continue;
                };
                let n = pipe.write(&data[*written..]);
                *written += n;
                progressed |= n > 0;
                if *written == data.len() {
                    let total = data.len();
                    pipe.writers_mut().pop_front();
                    self.wake(writer, total as i64);
                }
            }

            if !progressed {
                break;
            }
        }
    }

    // ========================================================================
    // Reclaim
    // ========================================================================

    pub(crate) fn sys_reclaim(&mut self, id: HandleId) -> KernelResult<Outcome> {
        let busy = match self.objects.get(id)? {
            KernelObject::Lock(lock) => {
                lock.is_busy()
                    || self.procs.values().any(|p| {
                        matches!(p.blocked_on(), Some(BlockOn::Cvar { lock, .. }) if *lock == id)
                    })
            }
            KernelObject::Cvar(cvar) => cvar.is_busy(),
            KernelObject::Pipe(pipe) => !pipe.writers().is_empty(),
        };
        if busy {
            return Err(KernelError::ResourceBusy);
        }

        if let KernelObject::Pipe(mut pipe) = self.objects.remove(id)? {
            let readers: Vec<Pid> = pipe.readers_mut().drain(..).collect();
            for reader in readers {
                self.wake(reader, 0);
            }
        }
        log::debug!("ipc: handle {} reclaimed", id);
        Ok(Outcome::Return(0))
    }
}
