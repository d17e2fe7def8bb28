//! 带数据的自旋锁
//!
//! 内核的全局状态放在一把 [`SpinLock`] 里。硬件入口函数先拿锁再处理陷阱，
//! 持锁期间陷阱被屏蔽，所以同一时刻只有一个控制流在修改内核状态。

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};

use crate::raw_spin_lock::{RawSpinLock, RawSpinLockGuard};

/// 保护一份数据的自旋锁
///
/// 不可重入：持锁的控制流再次调用 [`SpinLock::lock`] 会永远自旋。
/// 单核机器上这只可能是陷阱入口在内核持锁时被调用，而陷阱已被屏蔽。
#[derive(Debug)]
pub struct SpinLock<T> {
    raw: RawSpinLock,
    data: UnsafeCell<T>,
}

// SAFETY: 对 data 的访问都经过 raw 的互斥
unsafe impl<T: Send> Send for SpinLock<T> {}
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    /// 创建一把未加锁的锁
    pub const fn new(data: T) -> Self {
        SpinLock {
            raw: RawSpinLock::new(),
            data: UnsafeCell::new(data),
        }
    }

    /// 加锁，返回的保护器离开作用域时解锁并恢复陷阱状态
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        SpinLockGuard {
            owner: self,
            raw: self.raw.lock(),
        }
    }

    /// 锁空闲时加锁，否则返回 `None`
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        let raw = self.raw.try_lock()?;
        Some(SpinLockGuard { owner: self, raw })
    }

    /// 在持锁状态下执行 `f`
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    /// 锁是否被占用
    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }

    /// 独占借用时无需加锁
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// 取出数据
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// [`SpinLock`] 的保护器
pub struct SpinLockGuard<'a, T> {
    owner: &'a SpinLock<T>,
    raw: RawSpinLockGuard<'a>,
}

impl<T> SpinLockGuard<'_, T> {
    /// 加锁前陷阱是否开启
    pub fn traps_were_enabled(&self) -> bool {
        self.raw.traps_were_enabled()
    }
}

impl<T> Deref for SpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: 保护器存在期间锁被持有
        unsafe { &*self.owner.data.get() }
    }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: 同上，且 &mut self 保证没有其它借用
        unsafe { &mut *self.owner.data.get() }
    }
}
