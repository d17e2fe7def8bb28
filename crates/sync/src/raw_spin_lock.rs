//! 不带数据的自旋锁

use core::hint;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::trap_guard::TrapGuard;

/// 只保护一个“占用”标志的自旋锁
///
/// 加锁顺序固定为先屏蔽陷阱再抢占标志，解锁时反过来。
#[derive(Debug, Default)]
pub struct RawSpinLock {
    held: AtomicBool,
}

impl RawSpinLock {
    /// 创建一把未加锁的锁
    pub const fn new() -> Self {
        RawSpinLock {
            held: AtomicBool::new(false),
        }
    }

    /// 自旋直到拿到锁
    pub fn lock(&self) -> RawSpinLockGuard<'_> {
        let traps = TrapGuard::new();
        while !self.acquire() {
            while self.is_locked() {
                hint::spin_loop();
            }
        }
        RawSpinLockGuard { lock: self, traps }
    }

    /// 只尝试一次，失败时陷阱状态随之恢复
    pub fn try_lock(&self) -> Option<RawSpinLockGuard<'_>> {
        let traps = TrapGuard::new();
        self.acquire()
            .then(|| RawSpinLockGuard { lock: self, traps })
    }

    /// 锁是否被占用
    pub fn is_locked(&self) -> bool {
        self.held.load(Ordering::Relaxed)
    }

    fn acquire(&self) -> bool {
        self.held
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }
}

/// 持有 [`RawSpinLock`] 的凭证
///
/// 字段顺序决定 drop 顺序：先放开标志，再恢复陷阱。
pub struct RawSpinLockGuard<'a> {
    lock: &'a RawSpinLock,
    traps: TrapGuard,
}

impl RawSpinLockGuard<'_> {
    /// 加锁前陷阱是否开启
    pub fn traps_were_enabled(&self) -> bool {
        self.traps.was_enabled()
    }
}

impl Drop for RawSpinLockGuard<'_> {
    fn drop(&mut self) {
        self.lock.held.store(false, Ordering::Release);
    }
}
