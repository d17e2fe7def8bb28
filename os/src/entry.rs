//! 硬件入口
//!
//! 模拟硬件只认识几个入口函数：
//!
//! - [`set_kernel_brk`]：内核堆分配器推进 break（启动前后都可能调用）
//! - [`kernel_start`]：启动内核
//! - [`trap_entry`]：投递一次陷阱
//!
//! 内核状态保存在全局自旋锁里，持锁期间陷阱投递被屏蔽。

use alloc::boxed::Box;
use alloc::string::String;

use lazy_static::lazy_static;
use sync::SpinLock;
use uapi::errno::{ERROR, SUCCESS};

use crate::arch::{self, Hardware, KernelImage, ProgramLoader, UserContext};
use crate::config::KernelConfig;
use crate::kernel::Kernel;
use crate::kernel::boot::Bootstrap;

/// 全局内核状态
enum KernelCell {
    /// 尚未开启虚拟内存
    Cold(Bootstrap),
    /// 已启动
    Running(Kernel),
}

lazy_static! {
    static ref KERNEL: SpinLock<Option<KernelCell>> = SpinLock::new(None);
}

/// 注册硬件与装载器，必须先于其它入口调用
pub fn prepare(
    config: KernelConfig,
    image: KernelImage,
    hw: Box<dyn Hardware>,
    loader: Box<dyn ProgramLoader>,
) {
    // SAFETY: 启动阶段只有一个控制流
    unsafe { arch::init_sync_trap_control() };
    let boot = Bootstrap::new(config, image, hw, loader);
    KERNEL.with(|cell| *cell = Some(KernelCell::Cold(boot)));
}

/// 推进内核 break，成功返回 0，失败返回 [`ERROR`]
pub fn set_kernel_brk(addr: usize) -> i64 {
    let result = KERNEL.with(|cell| match cell.as_mut() {
        Some(KernelCell::Cold(boot)) => Some(boot.set_kernel_brk(addr)),
        Some(KernelCell::Running(kernel)) => Some(kernel.set_kernel_brk(addr)),
        None => None,
    });
    match result {
        Some(Ok(())) => SUCCESS,
        Some(Err(e)) => e.to_errno(),
        None => {
            log::error!("entry: set_kernel_brk before prepare");
            ERROR
        }
    }
}

/// 启动内核，返回时 `ctx` 是第一个要运行的进程的上下文
///
/// # Panics
/// 未调用 [`prepare`] 或重复启动时 panic。
pub fn kernel_start(cmd_args: &[String], pmem_size: usize, ctx: &mut UserContext) {
    let mut guard = KERNEL.lock();
    let kernel = match guard.take() {
        Some(KernelCell::Cold(boot)) => boot.start(cmd_args, pmem_size, ctx),
        Some(KernelCell::Running(_)) => panic!("entry: kernel already started"),
        None => panic!("entry: kernel_start before prepare"),
    };
    *guard = Some(KernelCell::Running(kernel));
}

/// 投递一次陷阱
///
/// # Panics
/// 内核尚未启动时 panic。
pub fn trap_entry(ctx: &mut UserContext) {
    with_kernel(|kernel| kernel.handle_trap(ctx));
}

/// 在持锁状态下访问已启动的内核
///
/// # Panics
/// 内核尚未启动时 panic。
pub fn with_kernel<R>(f: impl FnOnce(&mut Kernel) -> R) -> R {
    KERNEL.with(|cell| match cell.as_mut() {
        Some(KernelCell::Running(kernel)) => f(kernel),
        _ => panic!("entry: kernel not started"),
    })
}
