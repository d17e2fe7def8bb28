//! 进程相关系统调用与进程退出

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use uapi::limits::{MAX_ARGS, MAX_STRING_LEN};

use super::Outcome;
use crate::arch::TlbFlush;
use crate::error::{KernelError, KernelResult};
use crate::kernel::Kernel;
use crate::kernel::task::{BlockOn, IDLE_PID, INIT_PID, Pcb, Pid, ProcessState, build_process_image};

const WORD: usize = core::mem::size_of::<u64>();

impl Kernel {
    pub(crate) fn sys_fork(&mut self) -> KernelResult<Outcome> {
        let ppid = self.current_pid();
        let parent = match self.procs.get(&ppid) {
            Some(pcb) => pcb,
            None => panic!("fork: no process with pid {}", ppid),
        };
        let space = parent.space.clone_for_fork(&mut self.mem)?;
        let mut ctx = parent.ctx;
        ctx.set_return(0);
        let name = parent.name.clone();

        let pid = self.pids.allocate();
        self.procs
            .insert(pid, Pcb::new(pid, Some(ppid), name, space, ctx));
        self.pcb_mut(ppid).children.push(pid);
        self.sched.enqueue(pid);
        log::debug!("fork: {} -> {}", ppid, pid);
        Ok(Outcome::Return(pid as i64))
    }

    pub(crate) fn sys_exec(&mut self, name_ptr: usize, argv_ptr: usize) -> KernelResult<Outcome> {
        let pid = self.current_pid();
        let name = self.read_user_string(pid, name_ptr)?;
        let args = if argv_ptr == 0 {
            vec![name.clone()]
        } else {
            self.read_user_argv(pid, argv_ptr)?
        };

        let image = self.loader.load(&name, &args).map_err(|e| {
            log::warn!("exec: cannot load {}: {}", name, e);
            KernelError::InvalidProgram
        })?;
        let (space, ctx) = build_process_image(
            &self.config.layout,
            &image,
            &args,
            self.config.initial_stack_pages,
            &mut self.mem,
        )?;

        let pcb = match self.procs.get_mut(&pid) {
            Some(pcb) => pcb,
            None => panic!("exec: no process with pid {}", pid),
        };
        let mut old = core::mem::replace(&mut pcb.space, space);
        old.release_all(&mut self.mem);
        pcb.ctx = ctx;
        pcb.name = name;
        log::info!("exec: pid {} now runs {}", pid, pcb.name);
        Ok(Outcome::NoReturn)
    }

    pub(crate) fn sys_exit(&mut self, status: i32) -> KernelResult<Outcome> {
        let pid = self.current_pid();
        if pid == IDLE_PID {
            return Err(KernelError::InvalidArgument);
        }
        self.terminate(pid, status);
        Ok(Outcome::NoReturn)
    }

    pub(crate) fn sys_wait(&mut self, status_addr: usize) -> KernelResult<Outcome> {
        let pid = self.current_pid();
        if self.pcb(pid).children.is_empty() {
            return Err(KernelError::NoChildren);
        }
        if status_addr != 0 {
            self.probe_user(pid, status_addr, core::mem::size_of::<i32>())?;
        }
        if let Some((child, status)) = self.reap_next(pid) {
            self.write_status(pid, status_addr, status)?;
            return Ok(Outcome::Return(child as i64));
        }
        self.block_current(BlockOn::Wait { status_addr });
        Ok(Outcome::Blocked)
    }

    pub(crate) fn sys_brk(&mut self, addr: usize) -> KernelResult<Outcome> {
        let layout = self.config.layout;
        let pid = self.current_pid();
        let pcb = match self.procs.get_mut(&pid) {
            Some(pcb) => pcb,
            None => panic!("brk: no process with pid {}", pid),
        };
        let old = pcb.space.brk();
        pcb.space.set_brk(addr, &mut self.mem)?;
        if layout.up_to_page(addr) < layout.up_to_page(old) {
            self.flush_tlb(TlbFlush::Region1);
        }
        Ok(Outcome::Return(0))
    }

    pub(crate) fn sys_delay(&mut self, ticks: i64) -> KernelResult<Outcome> {
        match ticks {
            t if t < 0 => Err(KernelError::InvalidArgument),
            0 => Ok(Outcome::Return(0)),
            t => {
                self.block_current(BlockOn::Delay {
                    remaining: t as u64,
                });
                Ok(Outcome::Blocked)
            }
        }
    }

    // ========================================================================
    // 退出与回收
    // ========================================================================

    /// 终止进程：移出所有队列，释放地址空间，安置子进程，通知父进程
    pub(crate) fn terminate(&mut self, pid: Pid, status: i32) {
        log::info!("process {} exited with status {}", pid, status);

        self.sched.remove(pid);
        self.objects.remove_waiter(pid);
        for tty in &mut self.ttys {
            tty.remove_waiter(pid);
        }
        for lock in self.objects.locks_owned_by(pid) {
            log::warn!("process {} exited holding lock {}", pid, lock);
            self.unlock(lock, pid);
        }

        let pcb = match self.procs.get_mut(&pid) {
            Some(pcb) => pcb,
            None => panic!("exit: no process with pid {}", pid),
        };
        pcb.space.release_all(&mut self.mem);
        pcb.state = ProcessState::Zombie(status);
        let parent = pcb.parent;
        let children = core::mem::take(&mut pcb.children);
        let exited = core::mem::take(&mut pcb.exited);
        self.adopt_orphans(pid, children, exited);

        match parent.filter(|ppid| self.procs.contains_key(ppid)) {
            Some(ppid) => {
                self.pcb_mut(ppid).exited.push_back(pid);
                self.complete_wait(ppid);
            }
            None => {
                self.procs.remove(&pid);
            }
        }

        if pid == INIT_PID {
            log::info!("init exited, halting");
            self.hw.halt();
        }
    }

    /// 孤儿交给 init；init 自己退出时，孤儿不再有父进程，已退出的直接回收
    fn adopt_orphans(&mut self, dead: Pid, children: Vec<Pid>, exited: VecDeque<Pid>) {
        if children.is_empty() {
            return;
        }
        let heir = (dead != INIT_PID && self.procs.contains_key(&INIT_PID)).then_some(INIT_PID);
        for &child in &children {
            let orphan = self.pcb_mut(child);
            orphan.parent = heir;
            if heir.is_none() && orphan.is_zombie() {
                self.procs.remove(&child);
            }
        }
        if let Some(init) = heir {
            log::debug!("process {} orphans {:?} adopted by init", dead, children);
            let init_pcb = self.pcb_mut(init);
            init_pcb.children.extend(children);
            init_pcb.exited.extend(exited);
            self.complete_wait(init);
        }
    }

    /// 父进程正阻塞在 Wait 且有已退出的子进程时，完成这次 Wait
    fn complete_wait(&mut self, ppid: Pid) {
        let Some(BlockOn::Wait { status_addr }) = self.procs.get(&ppid).and_then(|p| p.blocked_on())
        else {
            return;
        };
        let status_addr = *status_addr;
        let Some((child, status)) = self.reap_next(ppid) else {
            return;
        };
        let ret = match self.write_status(ppid, status_addr, status) {
            Ok(()) => child as i64,
            Err(e) => {
                log::warn!("wait: pid {} status write failed: {}", ppid, e);
                e.to_errno()
            }
        };
        self.wake(ppid, ret);
    }

    /// 回收最早退出的子进程
    fn reap_next(&mut self, ppid: Pid) -> Option<(Pid, i32)> {
        let parent = self.procs.get_mut(&ppid)?;
        let child = parent.exited.pop_front()?;
        parent.children.retain(|&c| c != child);
        let zombie = self.procs.remove(&child)?;
        match zombie.state {
            ProcessState::Zombie(status) => {
                log::debug!("wait: {} reaped {} (status {})", ppid, child, status);
                Some((child, status))
            }
            other => panic!("wait: reaped pid {} in state {:?}", child, other),
        }
    }

    fn write_status(&mut self, pid: Pid, addr: usize, status: i32) -> KernelResult<()> {
        if addr == 0 {
            return Ok(());
        }
        self.copy_to_user(pid, addr, &status.to_le_bytes())
    }

    // ========================================================================
    // 用户参数
    // ========================================================================

    fn read_user_string(&self, pid: Pid, addr: usize) -> KernelResult<String> {
        let bytes = self.pcb(pid).space.read_cstr(&self.mem, addr, MAX_STRING_LEN)?;
        String::from_utf8(bytes).map_err(|_| KernelError::InvalidArgument)
    }

    fn read_user_argv(&self, pid: Pid, argv: usize) -> KernelResult<Vec<String>> {
        let mut args = Vec::new();
        for i in 0..=MAX_ARGS {
            let slot = argv
                .checked_add(i * WORD)
                .ok_or(KernelError::BadAddress)?;
            let ptr = self.pcb(pid).space.read_word(&self.mem, slot)?;
            if ptr == 0 {
                return Ok(args);
            }
            args.push(self.read_user_string(pid, ptr)?);
        }
        Err(KernelError::InvalidArgument)
    }
}
