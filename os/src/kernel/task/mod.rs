//! 进程管理
//!
//! - [`Pcb`]：进程控制块，独占自己的区域 1 地址空间
//! - [`PidAllocator`]：单调递增的进程号
//! - `exec`：按程序映像构建新的地址空间与初始上下文

mod exec;
mod pcb;
mod pid_allocator;

pub(crate) use exec::build_process_image;
pub use pcb::*;
pub use pid_allocator::PidAllocator;

/// 进程号
pub type Pid = u32;

/// idle 进程号
pub const IDLE_PID: Pid = 0;

/// init 进程号
pub const INIT_PID: Pid = 1;
