//! 内核配置
//!
//! 机器布局之外的可调参数都集中在 [`KernelConfig`]，默认值与硬件一致。

use alloc::string::String;
use mm::MachineLayout;
use uapi::limits::{NUM_TERMINALS, PIPE_BUFFER_LEN, TERMINAL_MAX_LINE};

use crate::logging::DEFAULT_TRACE_LEVEL;

/// 默认物理内存大小（2 MiB）
pub const DEFAULT_PMEM_SIZE: usize = 0x20_0000;

/// 默认的 init 程序名
pub const DEFAULT_INIT_PROGRAM: &str = "init";

/// 内核配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelConfig {
    /// 机器布局
    pub layout: MachineLayout,
    /// 物理内存大小（字节）
    pub pmem_size: usize,
    /// 终端个数
    pub num_terminals: usize,
    /// 单次终端收发上限
    pub terminal_max_line: usize,
    /// 管道缓冲区容量
    pub pipe_capacity: usize,
    /// 新进程初始栈页数
    pub initial_stack_pages: usize,
    /// 命令行未给出程序时装载的 init
    pub init_program: String,
    /// 日志跟踪级别（0..=5）
    pub trace_level: u8,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            layout: MachineLayout::default(),
            pmem_size: DEFAULT_PMEM_SIZE,
            num_terminals: NUM_TERMINALS,
            terminal_max_line: TERMINAL_MAX_LINE,
            pipe_capacity: PIPE_BUFFER_LEN,
            initial_stack_pages: 2,
            init_program: String::from(DEFAULT_INIT_PROGRAM),
            trace_level: DEFAULT_TRACE_LEVEL,
        }
    }
}
