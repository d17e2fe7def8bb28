//! 内核日志子系统
//!
//! 内核各 crate 通过 `log` 门面（`log::info!` 等）记录日志，
//! 本 crate 提供门面背后的实现 [`KernelLogger`]。
//!
//! # 输出格式
//!
//! ```text
//! [     42] [ INFO] [pid 1] duos::kernel::boot: vm enabled
//! ```
//!
//! 依次为时钟滴答数、级别、当前进程号（无进程时为 `-`）、target 与消息。
//!
//! # 架构解耦
//!
//! 日志系统通过 trait 抽象与内核其它部分解耦：
//!
//! - **LogContextProvider**：提供当前进程号、时钟滴答数
//! - **LogOutput**：提供输出能力
//!
//! 使用方需要在启动时注册这些 trait 的实现。未注册输出时日志被丢弃并计数。

#![no_std]

extern crate alloc;

mod level;

pub use level::{level_from_trace, DEFAULT_TRACE_LEVEL};

use alloc::string::String;
use core::fmt::{self, Write};
use core::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};
use log::{Level, LevelFilter, Log, Metadata, Record};

// ========== Trait 定义 ==========

/// 日志上下文提供者 trait
pub trait LogContextProvider: Send + Sync {
    /// 获取当前进程号（如果没有运行中的进程则返回 `None`）
    fn pid(&self) -> Option<u32>;
    /// 获取当前时钟滴答数
    fn ticks(&self) -> u64;
}

/// 日志输出 trait
pub trait LogOutput: Send + Sync {
    /// 输出一行已格式化的日志
    fn write_str(&self, s: &str);
}

// ========== 全局注册机制 ==========

/// 存储 trait object 的胖指针
struct FatPtr {
    data: AtomicPtr<()>,
    vtable: AtomicPtr<()>,
}

impl FatPtr {
    const fn new() -> Self {
        Self {
            data: AtomicPtr::new(core::ptr::null_mut()),
            vtable: AtomicPtr::new(core::ptr::null_mut()),
        }
    }

    fn store(&self, (data, vtable): (*mut (), *mut ())) {
        self.data.store(data, Ordering::Release);
        self.vtable.store(vtable, Ordering::Release);
    }

    fn load(&self) -> Option<(*mut (), *mut ())> {
        let data = self.data.load(Ordering::Acquire);
        let vtable = self.vtable.load(Ordering::Acquire);
        if data.is_null() || vtable.is_null() {
            return None;
        }
        Some((data, vtable))
    }
}

static CONTEXT_PROVIDER: FatPtr = FatPtr::new();
static LOG_OUTPUT: FatPtr = FatPtr::new();
static DROPPED: AtomicUsize = AtomicUsize::new(0);

/// 注册日志上下文提供者
///
/// # Safety
///
/// - provider 必须具有 'static 生命周期
/// - 不能与日志调用并发执行
pub unsafe fn register_context_provider(provider: &'static dyn LogContextProvider) {
    let ptr: *const dyn LogContextProvider = provider;
    CONTEXT_PROVIDER.store(unsafe { core::mem::transmute::<_, (*mut (), *mut ())>(ptr) });
}

/// 注册日志输出
///
/// # Safety
///
/// - output 必须具有 'static 生命周期
/// - 不能与日志调用并发执行
pub unsafe fn register_log_output(output: &'static dyn LogOutput) {
    let ptr: *const dyn LogOutput = output;
    LOG_OUTPUT.store(unsafe { core::mem::transmute::<_, (*mut (), *mut ())>(ptr) });
}

fn context_provider() -> Option<&'static dyn LogContextProvider> {
    // Safety: 指针由 register_context_provider 设置，保证有效
    CONTEXT_PROVIDER.load().map(|parts| unsafe {
        core::mem::transmute::<(*mut (), *mut ()), &'static dyn LogContextProvider>(parts)
    })
}

fn log_output() -> Option<&'static dyn LogOutput> {
    // Safety: 指针由 register_log_output 设置，保证有效
    LOG_OUTPUT.load().map(|parts| unsafe {
        core::mem::transmute::<(*mut (), *mut ()), &'static dyn LogOutput>(parts)
    })
}

/// 因未注册输出而丢弃的日志条数
pub fn dropped_count() -> usize {
    DROPPED.load(Ordering::Relaxed)
}

// ========== 格式化 ==========

/// 把一条日志格式化到 `out`，末尾带换行
pub fn format_entry(
    out: &mut impl Write,
    ticks: u64,
    level: Level,
    pid: Option<u32>,
    target: &str,
    args: fmt::Arguments<'_>,
) -> fmt::Result {
    write!(out, "[{:>7}] [{:>5}] ", ticks, level)?;
    match pid {
        Some(pid) => write!(out, "[pid {}] ", pid)?,
        None => out.write_str("[pid -] ")?,
    }
    writeln!(out, "{}: {}", target, args)
}

// ========== log::Log 实现 ==========

/// `log` 门面的内核实现
pub struct KernelLogger;

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let Some(output) = log_output() else {
            DROPPED.fetch_add(1, Ordering::Relaxed);
            return;
        };
        let (pid, ticks) = context_provider()
            .map(|ctx| (ctx.pid(), ctx.ticks()))
            .unwrap_or((None, 0));
        let mut line = String::new();
        if format_entry(
            &mut line,
            ticks,
            record.level(),
            pid,
            record.target(),
            *record.args(),
        )
        .is_ok()
        {
            output.write_str(&line);
        }
    }

    fn flush(&self) {}
}

static LOGGER: KernelLogger = KernelLogger;

/// 安装内核日志实现并设置级别阈值
///
/// 重复调用只会更新级别阈值。
pub fn init(level: LevelFilter) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}

#[cfg(test)]
mod tests;
