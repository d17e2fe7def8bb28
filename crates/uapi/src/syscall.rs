//! 系统调用号
//!
//! 用户程序把调用号放入 `UserContext::code`，参数依次放入 `regs[0..]`，
//! 内核把返回值写回 `regs[0]`。

pub const SYS_FORK: usize = 0x1;
pub const SYS_EXEC: usize = 0x2;
pub const SYS_EXIT: usize = 0x3;
pub const SYS_WAIT: usize = 0x4;
pub const SYS_GETPID: usize = 0x5;
pub const SYS_BRK: usize = 0x6;
pub const SYS_DELAY: usize = 0x7;

pub const SYS_TTY_READ: usize = 0x15;
pub const SYS_TTY_WRITE: usize = 0x16;

pub const SYS_PIPE_INIT: usize = 0x30;
pub const SYS_PIPE_READ: usize = 0x31;
pub const SYS_PIPE_WRITE: usize = 0x32;

pub const SYS_LOCK_INIT: usize = 0x40;
pub const SYS_LOCK_ACQUIRE: usize = 0x41;
pub const SYS_LOCK_RELEASE: usize = 0x42;
pub const SYS_CVAR_INIT: usize = 0x43;
pub const SYS_CVAR_SIGNAL: usize = 0x44;
pub const SYS_CVAR_BROADCAST: usize = 0x45;
pub const SYS_CVAR_WAIT: usize = 0x46;

pub const SYS_RECLAIM: usize = 0x50;
