//! 内核日志子系统
//!
//! 日志通过 `log` 门面记录，由 klog crate 的 `KernelLogger` 输出。
//! 本模块提供 OS 层的上下文（当前进程号、时钟滴答）并负责注册。

use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

pub use klog::{DEFAULT_TRACE_LEVEL, LogOutput, level_from_trace};

use crate::kernel::task::Pid;

const NO_PID: u32 = u32::MAX;

static CURRENT_PID: AtomicU32 = AtomicU32::new(NO_PID);
static TICKS: AtomicU64 = AtomicU64::new(0);

// ========== LogContextProvider 实现 ==========

/// OS 层的日志上下文提供者
///
/// 日志可能在持有内核锁时记录，因此上下文从原子变量读取，不访问内核状态。
struct OsLogContextProvider;

impl klog::LogContextProvider for OsLogContextProvider {
    fn pid(&self) -> Option<u32> {
        match CURRENT_PID.load(Ordering::Relaxed) {
            NO_PID => None,
            pid => Some(pid),
        }
    }

    fn ticks(&self) -> u64 {
        TICKS.load(Ordering::Relaxed)
    }
}

static OS_LOG_CONTEXT_PROVIDER: OsLogContextProvider = OsLogContextProvider;

/// 初始化日志系统
///
/// 注册上下文提供者与输出，并按数字跟踪级别（0..=5）设置阈值。
pub fn init(output: &'static dyn LogOutput, trace_level: u8) {
    // Safety: 两个实现都是 'static，初始化发生在任何陷阱之前
    unsafe {
        klog::register_context_provider(&OS_LOG_CONTEXT_PROVIDER);
        klog::register_log_output(output);
    }
    klog::init(level_from_trace(trace_level));
}

/// 记录当前运行的进程
pub(crate) fn set_current_pid(pid: Pid) {
    CURRENT_PID.store(pid, Ordering::Relaxed);
}

/// 记录当前时钟滴答
pub(crate) fn set_ticks(ticks: u64) {
    TICKS.store(ticks, Ordering::Relaxed);
}
