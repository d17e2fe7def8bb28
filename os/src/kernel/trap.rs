//! 陷阱向量表
//!
//! 向量表在启动时一次性构建，之后只读。每个槽位对应一个 [`TrapCause`]，
//! 处理函数由穷尽匹配选出，未使用的槽位（8..16）都是空操作。

use alloc::vec::Vec;

use uapi::trap::*;
use uapi::wait::KILLED_STATUS;

use super::Kernel;
use super::task::{BlockOn, IDLE_PID, ProcessState};
use crate::arch::UserContext;
use crate::logging;

/// 陷阱处理函数
pub type TrapHandler = fn(&mut Kernel, &UserContext);

/// 陷阱原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapCause {
    /// 系统调用
    Kernel,
    /// 时钟
    Clock,
    /// 非法指令
    Illegal,
    /// 内存访问异常
    Memory,
    /// 算术异常
    Math,
    /// 终端收到一行
    TtyReceive,
    /// 终端发送完成
    TtyTransmit,
    /// 磁盘
    Disk,
    /// 保留编号
    Unbound(usize),
}

impl From<usize> for TrapCause {
    fn from(vector: usize) -> Self {
        match vector {
            TRAP_KERNEL => TrapCause::Kernel,
            TRAP_CLOCK => TrapCause::Clock,
            TRAP_ILLEGAL => TrapCause::Illegal,
            TRAP_MEMORY => TrapCause::Memory,
            TRAP_MATH => TrapCause::Math,
            TRAP_TTY_RECEIVE => TrapCause::TtyReceive,
            TRAP_TTY_TRANSMIT => TrapCause::TtyTransmit,
            TRAP_DISK => TrapCause::Disk,
            other => TrapCause::Unbound(other),
        }
    }
}

impl TrapCause {
    fn handler(self) -> TrapHandler {
        match self {
            TrapCause::Kernel => syscall_trap,
            TrapCause::Clock => clock_trap,
            TrapCause::Illegal | TrapCause::Math => fault_trap,
            TrapCause::Memory => memory_trap,
            TrapCause::TtyReceive => tty_receive_trap,
            TrapCause::TtyTransmit => tty_transmit_trap,
            TrapCause::Disk => disk_trap,
            TrapCause::Unbound(_) => unbound_trap,
        }
    }
}

/// 陷阱向量表
pub struct TrapVector {
    handlers: [TrapHandler; TRAP_VECTOR_SIZE],
}

impl TrapVector {
    /// 为每个槽位填入处理函数
    pub fn new() -> Self {
        let mut handlers = [unbound_trap as TrapHandler; TRAP_VECTOR_SIZE];
        for (vector, slot) in handlers.iter_mut().enumerate() {
            *slot = TrapCause::from(vector).handler();
        }
        TrapVector { handlers }
    }

    /// 查找处理函数，越界编号视为空操作
    pub fn handler(&self, vector: usize) -> TrapHandler {
        self.handlers
            .get(vector)
            .copied()
            .unwrap_or(unbound_trap as TrapHandler)
    }
}

impl Default for TrapVector {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// 处理函数
// ============================================================================

fn syscall_trap(kernel: &mut Kernel, frame: &UserContext) {
    super::syscall::handle(kernel, frame);
}

/// 时钟：推进睡眠计数，唤醒到期进程，再把当前进程放回队尾
fn clock_trap(kernel: &mut Kernel, _frame: &UserContext) {
    kernel.ticks += 1;
    logging::set_ticks(kernel.ticks);

    let mut expired = Vec::new();
    for &pid in kernel.sched.sleepers() {
        if let Some(pcb) = kernel.procs.get_mut(&pid) {
            if let ProcessState::Blocked(BlockOn::Delay { remaining }) = &mut pcb.state {
                *remaining = remaining.saturating_sub(1);
                if *remaining == 0 {
                    expired.push(pid);
                }
            }
        }
    }
    for pid in expired {
        kernel.sched.remove_sleeper(pid);
        kernel.wake(pid, 0);
    }

    kernel.preempt_current();
    kernel.schedule();
}

/// 非法指令与算术异常：终止出错的进程
fn fault_trap(kernel: &mut Kernel, frame: &UserContext) {
    let pid = kernel.current_pid();
    if pid == IDLE_PID {
        log::error!("trap: idle raised fault {} at pc {:#x}", frame.vector, frame.pc);
        return;
    }
    log::warn!(
        "trap: killing pid {} (vector {}, pc {:#x})",
        pid,
        frame.vector,
        frame.pc
    );
    kernel.terminate(pid, KILLED_STATUS);
}

/// 内存异常：栈之下、红区之上的地址按需扩展栈，其它情况终止进程
fn memory_trap(kernel: &mut Kernel, frame: &UserContext) {
    let pid = kernel.current_pid();
    if pid == IDLE_PID {
        log::error!("trap: idle faulted at {:#x}", frame.addr);
        return;
    }
    let Some(pcb) = kernel.procs.get_mut(&pid) else {
        return;
    };
    match pcb.space.grow_stack_to(frame.addr, &mut kernel.mem) {
        Ok(()) => {
            log::debug!(
                "trap: pid {} stack grown to {:#x}",
                pid,
                pcb.space.stack_low()
            );
        }
        Err(e) => {
            log::warn!(
                "trap: killing pid {} (bad access at {:#x}: {})",
                pid,
                frame.addr,
                e
            );
            kernel.terminate(pid, KILLED_STATUS);
        }
    }
}

fn tty_receive_trap(kernel: &mut Kernel, frame: &UserContext) {
    kernel.tty_received(frame.code);
}

fn tty_transmit_trap(kernel: &mut Kernel, frame: &UserContext) {
    kernel.tty_transmitted(frame.code);
}

fn disk_trap(_kernel: &mut Kernel, frame: &UserContext) {
    log::debug!("trap: disk interrupt (code {:#x})", frame.code);
}

fn unbound_trap(_kernel: &mut Kernel, frame: &UserContext) {
    log::trace!("trap: ignoring vector {}", frame.vector);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cause_decoding() {
        assert_eq!(TrapCause::from(TRAP_KERNEL), TrapCause::Kernel);
        assert_eq!(TrapCause::from(TRAP_DISK), TrapCause::Disk);
        assert_eq!(TrapCause::from(9), TrapCause::Unbound(9));
        assert_eq!(TrapCause::from(42), TrapCause::Unbound(42));
    }
}
