//! 同步原语
//!
//! 向其它内核模块提供自旋锁与陷阱屏蔽保护。
//!
//! 内核是单核的，真正需要防范的并发只有“内核代码 vs 陷阱处理”。
//! 因此锁在持有期间会屏蔽陷阱投递，释放时恢复。
//!
//! # 硬件依赖
//!
//! 此 crate 通过 [`TrapControl`] trait 抽象陷阱屏蔽操作。
//! 使用前必须调用 [`register_trap_control`] 注册实现。

#![no_std]

mod raw_spin_lock;
mod spin_lock;
mod trap_guard;

pub use raw_spin_lock::*;
pub use spin_lock::*;
pub use trap_guard::*;

use core::sync::atomic::{AtomicUsize, Ordering};

/// 陷阱屏蔽操作
///
/// 由内核的机器抽象层（或测试 mock）实现，通过 [`register_trap_control`] 注册。
pub trait TrapControl: Send + Sync {
    /// 屏蔽陷阱，返回屏蔽前是否开启
    ///
    /// # Safety
    /// 返回值必须稍后原样交给 [`TrapControl::restore_traps`]
    unsafe fn mask_traps(&self) -> bool;

    /// 恢复陷阱状态
    ///
    /// # Safety
    /// `was_enabled` 必须来自配对的 [`TrapControl::mask_traps`]
    unsafe fn restore_traps(&self, was_enabled: bool);
}

/// `&'static dyn TrapControl` 拆成数据指针和虚表指针两半存放
struct Registry {
    data: AtomicUsize,
    vtable: AtomicUsize,
}

static REGISTRY: Registry = Registry {
    data: AtomicUsize::new(0),
    vtable: AtomicUsize::new(0),
};

/// 注册陷阱控制实现，后注册的覆盖先注册的
///
/// # Safety
/// 不能与正在持锁的代码并发调用
pub unsafe fn register_trap_control(ctl: &'static dyn TrapControl) {
    // SAFETY: 胖指针的布局是 (data, vtable)
    let (data, vtable) = unsafe {
        core::mem::transmute::<*const dyn TrapControl, (usize, usize)>(ctl as *const _)
    };
    REGISTRY.vtable.store(vtable, Ordering::Release);
    REGISTRY.data.store(data, Ordering::Release);
}

pub(crate) fn trap_control() -> &'static dyn TrapControl {
    let data = REGISTRY.data.load(Ordering::Acquire);
    if data == 0 {
        panic!("sync: no TrapControl registered");
    }
    let vtable = REGISTRY.vtable.load(Ordering::Acquire);
    // SAFETY: 两半都来自 register_trap_control 中的同一个 'static 引用
    unsafe { &*core::mem::transmute::<(usize, usize), *const dyn TrapControl>((data, vtable)) }
}

#[cfg(test)]
mod tests;
