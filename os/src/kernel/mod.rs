//! 内核核心
//!
//! 全部内核状态集中在一个 [`Kernel`] 值里，由 [`boot::Bootstrap`] 一次性构建，
//! 之后每个陷阱都经过 [`Kernel::handle_trap`]：
//!
//! 1. 把硬件交来的用户上下文保存到当前进程；
//! 2. 按陷阱原因查向量表，调用处理函数；
//! 3. 当前进程不再运行时调度下一个进程，必要时切换区域 1 页表；
//! 4. 把被选中进程的上下文交还硬件。
//!
//! 进程阻塞不会让内核“停在半路”：阻塞原因里保存了完成操作所需的全部信息，
//! 唤醒者直接完成操作并把返回值写进被唤醒进程保存的 `regs[0]`。

pub mod boot;
pub mod sched;
pub mod syscall;
pub mod task;
pub mod trap;

#[cfg(test)]
mod tests;

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use mm::{FramePool, KernelSpace, PhysMemory, Protection, TableId};

use crate::arch::{Hardware, ProgramLoader, Register, TlbFlush, UserContext};
use crate::config::KernelConfig;
use crate::device::tty::Terminal;
use crate::error::{KernelError, KernelResult};
use crate::ipc::HandleTable;
use crate::logging;
use sched::Scheduler;
use task::{BlockOn, IDLE_PID, Pcb, Pid, PidAllocator, ProcessState};
use trap::TrapVector;

/// 内核状态
pub struct Kernel {
    config: KernelConfig,
    hw: Box<dyn Hardware>,
    loader: Box<dyn ProgramLoader>,
    mem: PhysMemory,
    kspace: KernelSpace,
    vectors: TrapVector,
    procs: BTreeMap<Pid, Pcb>,
    sched: Scheduler,
    pids: PidAllocator,
    objects: HandleTable,
    ttys: Vec<Terminal>,
    ticks: u64,
    /// 当前写入 PTBR1 的页表
    installed: Option<TableId>,
}

impl Kernel {
    // ========================================================================
    // 陷阱分发
    // ========================================================================

    /// 处理一次陷阱，返回时 `ctx` 已换成下一个要运行的进程的上下文
    pub fn handle_trap(&mut self, ctx: &mut UserContext) {
        let pid = self.sched.current();
        if let Some(pcb) = self.procs.get_mut(&pid) {
            pcb.ctx = *ctx;
        }
        let frame = *ctx;
        log::trace!("trap: vector {} code {:#x} from pid {}", frame.vector, frame.code, pid);
        let handler = self.vectors.handler(frame.vector);
        handler(self, &frame);
        self.dispatch(ctx);
    }

    fn dispatch(&mut self, ctx: &mut UserContext) {
        let cur = self.sched.current();
        let running = self
            .procs
            .get(&cur)
            .is_some_and(|p| p.state == ProcessState::Running);
        if !running || (cur == IDLE_PID && self.sched.has_ready()) {
            self.schedule();
        }
        self.switch_to(self.sched.current(), ctx);
    }

    /// 从就绪队列选出下一个进程，队列为空时选 idle
    pub(crate) fn schedule(&mut self) {
        let prev = self.sched.current();
        let next = loop {
            match self.sched.pick_next() {
                Some(pid)
                    if self
                        .procs
                        .get(&pid)
                        .is_some_and(|p| p.state == ProcessState::Ready) =>
                {
                    break pid;
                }
                Some(pid) => log::trace!("sched: dropping stale entry {}", pid),
                None => break IDLE_PID,
            }
        };
        if prev == IDLE_PID && next != IDLE_PID {
            self.pcb_mut(IDLE_PID).state = ProcessState::Ready;
        }
        self.pcb_mut(next).state = ProcessState::Running;
        if next != prev {
            log::debug!("sched: switch {} -> {}", prev, next);
        }
        self.sched.set_current(next);
    }

    fn switch_to(&mut self, pid: Pid, ctx: &mut UserContext) {
        let pcb = self.pcb(pid);
        let id = pcb.space.table().id();
        let len = pcb.space.table().len();
        *ctx = pcb.ctx;
        if self.installed != Some(id) {
            self.hw.write_register(Register::Ptbr1, id.as_usize());
            self.hw.write_register(Register::Ptlr1, len);
            self.flush_tlb(TlbFlush::Region1);
            self.installed = Some(id);
        }
        logging::set_current_pid(pid);
    }

    // ========================================================================
    // 进程状态
    // ========================================================================

    pub(crate) fn pcb(&self, pid: Pid) -> &Pcb {
        match self.procs.get(&pid) {
            Some(pcb) => pcb,
            None => panic!("kernel: no process with pid {}", pid),
        }
    }

    pub(crate) fn pcb_mut(&mut self, pid: Pid) -> &mut Pcb {
        match self.procs.get_mut(&pid) {
            Some(pcb) => pcb,
            None => panic!("kernel: no process with pid {}", pid),
        }
    }

    pub(crate) fn current_pcb_mut(&mut self) -> &mut Pcb {
        let pid = self.sched.current();
        self.pcb_mut(pid)
    }

    /// 阻塞当前进程
    pub(crate) fn block_current(&mut self, reason: BlockOn) {
        let pid = self.sched.current();
        if matches!(reason, BlockOn::Delay { .. }) {
            self.sched.add_sleeper(pid);
        }
        log::trace!("sched: pid {} blocked", pid);
        self.pcb_mut(pid).state = ProcessState::Blocked(reason);
    }

    /// 唤醒进程，`ret` 作为它那次系统调用的返回值
    pub(crate) fn wake(&mut self, pid: Pid, ret: i64) {
        if let Some(pcb) = self.procs.get_mut(&pid) {
            pcb.ctx.set_return(ret);
            pcb.state = ProcessState::Ready;
            self.sched.enqueue(pid);
            log::trace!("sched: wake pid {} with {}", pid, ret);
        }
    }

    /// 把正在运行的进程放回就绪队列尾部
    pub(crate) fn preempt_current(&mut self) {
        let pid = self.sched.current();
        if let Some(pcb) = self.procs.get_mut(&pid) {
            if pcb.state == ProcessState::Running {
                pcb.state = ProcessState::Ready;
                self.sched.enqueue(pid);
            }
        }
    }

    pub(crate) fn flush_tlb(&mut self, scope: TlbFlush) {
        self.hw.write_register(Register::TlbFlush, scope.encode());
    }

    // ========================================================================
    // 内存
    // ========================================================================

    /// 调整内核 break
    pub fn set_kernel_brk(&mut self, addr: usize) -> KernelResult<()> {
        let layout = self.config.layout;
        let old = self.kspace.brk();
        self.kspace.set_brk(addr, &mut self.mem).inspect_err(|e| {
            log::warn!("mm: kernel brk to {:#x} failed: {}", addr, e);
        })?;
        if layout.up_to_page(addr) < layout.up_to_page(old) {
            self.flush_tlb(TlbFlush::Region0);
        }
        Ok(())
    }

    /// 从进程的地址空间读取 `len` 字节
    pub fn copy_from_user(&self, pid: Pid, addr: usize, len: usize) -> KernelResult<Vec<u8>> {
        let pcb = self.procs.get(&pid).ok_or(KernelError::InvalidArgument)?;
        pcb.space
            .check_range(addr, len, Protection::READ)
            .map_err(|_| KernelError::BadAddress)?;
        let mut buf = alloc::vec![0u8; len];
        pcb.space.read_bytes(&self.mem, addr, &mut buf)?;
        Ok(buf)
    }

    /// 向进程的地址空间写入字节
    pub fn copy_to_user(&mut self, pid: Pid, addr: usize, data: &[u8]) -> KernelResult<()> {
        let pcb = self.procs.get(&pid).ok_or(KernelError::InvalidArgument)?;
        pcb.space.write_bytes(&mut self.mem, addr, data)?;
        Ok(())
    }

    /// 检查 `[addr, addr + len)` 对进程可读可写
    pub(crate) fn probe_user(&self, pid: Pid, addr: usize, len: usize) -> KernelResult<()> {
        let pcb = self.procs.get(&pid).ok_or(KernelError::InvalidArgument)?;
        pcb.space
            .check_range(addr, len, Protection::RW)
            .map_err(|_| KernelError::BadAddress)?;
        Ok(())
    }

    // ========================================================================
    // 查询
    // ========================================================================

    /// 配置
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// 正在运行的进程
    pub fn current_pid(&self) -> Pid {
        self.sched.current()
    }

    /// 按进程号查找进程
    pub fn process(&self, pid: Pid) -> Option<&Pcb> {
        self.procs.get(&pid)
    }

    /// 所有存活（含僵尸）进程号
    pub fn pids(&self) -> impl Iterator<Item = Pid> + '_ {
        self.procs.keys().copied()
    }

    /// 就绪队列
    pub fn ready_queue(&self) -> Vec<Pid> {
        self.sched.ready().collect()
    }

    /// 帧池
    pub fn frames(&self) -> &FramePool {
        self.mem.pool()
    }

    /// 内核地址空间
    pub fn kernel_space(&self) -> &KernelSpace {
        &self.kspace
    }

    /// 所有页表中有效页表项的总数
    pub fn mapped_frames(&self) -> usize {
        self.kspace.table().valid_count()
            + self
                .procs
                .values()
                .map(|p| p.space.mapped_pages())
                .sum::<usize>()
    }

    /// 句柄表
    pub fn objects(&self) -> &HandleTable {
        &self.objects
    }

    /// 终端
    pub fn terminal(&self, tty: usize) -> Option<&Terminal> {
        self.ttys.get(tty)
    }

    /// 时钟滴答数
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// 硬件
    pub fn hardware(&self) -> &dyn Hardware {
        self.hw.as_ref()
    }

    /// 硬件（可写）
    pub fn hardware_mut(&mut self) -> &mut dyn Hardware {
        self.hw.as_mut()
    }
}
