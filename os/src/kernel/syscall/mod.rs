//! 系统调用分发
//!
//! 调用号在 `UserContext::code`，参数在 `regs[0..]`。
//! 每个实现返回 [`Outcome`]：
//! - `Return(v)`：立即把 `v` 写入调用者的 `regs[0]`；
//! - `Blocked`：调用者已阻塞，返回值由唤醒者写入；
//! - `NoReturn`：调用者的上下文已被替换（Exec）或进程已不存在（Exit）。
//!
//! 任何错误都记一条 warn 日志，并以 [`uapi::errno::ERROR`] 返回。

mod ipc;
mod process;
mod tty;

use uapi::syscall::*;

use super::Kernel;
use crate::arch::UserContext;
use crate::error::{KernelError, KernelResult};

/// 系统调用的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 立即返回
    Return(i64),
    /// 调用者已阻塞
    Blocked,
    /// 调用者不再需要返回值
    NoReturn,
}

/// 处理一次系统调用陷阱
pub(crate) fn handle(kernel: &mut Kernel, frame: &UserContext) {
    let pid = kernel.current_pid();
    match dispatch(kernel, frame) {
        Ok(Outcome::Return(value)) => kernel.pcb_mut(pid).ctx.set_return(value),
        Ok(Outcome::Blocked) | Ok(Outcome::NoReturn) => {}
        Err(e) => {
            log::warn!("syscall {:#x} from pid {} failed: {}", frame.code, pid, e);
            if let Some(pcb) = kernel.procs.get_mut(&pid) {
                pcb.ctx.set_return(e.to_errno());
            }
        }
    }
}

fn dispatch(kernel: &mut Kernel, frame: &UserContext) -> KernelResult<Outcome> {
    log::debug!(
        "syscall {:#x} ({:#x}, {:#x}, {:#x}) from pid {}",
        frame.code,
        frame.regs[0],
        frame.regs[1],
        frame.regs[2],
        kernel.current_pid()
    );
    match frame.code {
        SYS_FORK => kernel.sys_fork(),
        SYS_EXEC => kernel.sys_exec(frame.arg(0), frame.arg(1)),
        SYS_EXIT => kernel.sys_exit(frame.signed_arg(0) as i32),
        SYS_WAIT => kernel.sys_wait(frame.arg(0)),
        SYS_GETPID => Ok(Outcome::Return(kernel.current_pid() as i64)),
        SYS_BRK => kernel.sys_brk(frame.arg(0)),
        SYS_DELAY => kernel.sys_delay(frame.signed_arg(0)),
        SYS_TTY_READ => kernel.sys_tty_read(frame.arg(0), frame.arg(1), frame.signed_arg(2)),
        SYS_TTY_WRITE => kernel.sys_tty_write(frame.arg(0), frame.arg(1), frame.signed_arg(2)),
        SYS_PIPE_INIT => kernel.sys_pipe_init(),
        SYS_PIPE_READ => kernel.sys_pipe_read(frame.arg(0), frame.arg(1), frame.signed_arg(2)),
        SYS_PIPE_WRITE => kernel.sys_pipe_write(frame.arg(0), frame.arg(1), frame.signed_arg(2)),
        SYS_LOCK_INIT => kernel.sys_lock_init(),
        SYS_LOCK_ACQUIRE => kernel.sys_acquire(frame.arg(0)),
        SYS_LOCK_RELEASE => kernel.sys_release(frame.arg(0)),
        SYS_CVAR_INIT => kernel.sys_cvar_init(),
        SYS_CVAR_SIGNAL => kernel.sys_cvar_signal(frame.arg(0)),
        SYS_CVAR_BROADCAST => kernel.sys_cvar_broadcast(frame.arg(0)),
        SYS_CVAR_WAIT => kernel.sys_cvar_wait(frame.arg(0), frame.arg(1)),
        SYS_RECLAIM => kernel.sys_reclaim(frame.arg(0)),
        _ => Err(KernelError::InvalidArgument),
    }
}

/// 把有符号长度参数转换为 `usize`，负数非法
fn length_arg(len: i64) -> KernelResult<usize> {
    usize::try_from(len).map_err(|_| KernelError::InvalidArgument)
}
