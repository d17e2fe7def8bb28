//! 陷阱原因编号
//!
//! 硬件在陷阱发生时把原因编号写入 `UserContext::vector`，
//! 内核据此索引陷阱向量表。

pub const TRAP_KERNEL: usize = 0;
pub const TRAP_CLOCK: usize = 1;
pub const TRAP_ILLEGAL: usize = 2;
pub const TRAP_MEMORY: usize = 3;
pub const TRAP_MATH: usize = 4;
pub const TRAP_TTY_RECEIVE: usize = 5;
pub const TRAP_TTY_TRANSMIT: usize = 6;
pub const TRAP_DISK: usize = 7;

/// 陷阱向量表长度，8 及以上的编号保留
pub const TRAP_VECTOR_SIZE: usize = 16;
