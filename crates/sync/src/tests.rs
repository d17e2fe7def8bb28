// sync 的单元测试，使用 test-support 的 MockTrapControl 作为陷阱控制实现。

extern crate std;

use crate::{RawSpinLock, SpinLock, TrapControl, TrapGuard, register_trap_control};
use test_support::mock::arch::{MOCK_TRAP_CONTROL, MockTrapControl};

impl TrapControl for MockTrapControl {
    unsafe fn mask_traps(&self) -> bool {
        unsafe { MockTrapControl::mask_traps(self) }
    }

    unsafe fn restore_traps(&self, was_enabled: bool) {
        unsafe { MockTrapControl::restore_traps(self, was_enabled) }
    }
}

fn setup() {
    // SAFETY: 每次注册的都是同一个静态实例
    unsafe { register_trap_control(&MOCK_TRAP_CONTROL) };
}

#[test]
fn test_trap_guard_masks_and_restores() {
    setup();
    assert!(MOCK_TRAP_CONTROL.traps_enabled());
    {
        let guard = TrapGuard::new();
        assert!(guard.was_enabled());
        assert!(!MOCK_TRAP_CONTROL.traps_enabled());
    }
    assert!(MOCK_TRAP_CONTROL.traps_enabled());
}

#[test]
fn test_trap_guard_nesting() {
    setup();
    let outer = TrapGuard::new();
    {
        let inner = TrapGuard::new();
        assert!(!inner.was_enabled());
    }
    // 内层恢复的是“已屏蔽”状态
    assert!(!MOCK_TRAP_CONTROL.traps_enabled());
    drop(outer);
    assert!(MOCK_TRAP_CONTROL.traps_enabled());
}

#[test]
fn test_raw_spin_lock_try_lock() {
    setup();
    let lock = RawSpinLock::new();
    let guard = lock.lock();
    assert!(lock.is_locked());
    assert!(guard.traps_were_enabled());
    assert!(lock.try_lock().is_none());
    // try_lock 失败后陷阱仍保持屏蔽
    assert!(!MOCK_TRAP_CONTROL.traps_enabled());
    drop(guard);
    assert!(!lock.is_locked());
    assert!(MOCK_TRAP_CONTROL.traps_enabled());
}

#[test]
fn test_spin_lock_guards_data() {
    setup();
    let lock = SpinLock::new(0usize);
    {
        let mut guard = lock.lock();
        *guard += 41;
        assert!(lock.is_locked());
        assert!(lock.try_lock().is_none());
    }
    assert_eq!(lock.with(|n| {
        *n += 1;
        *n
    }), 42);
    assert!(!lock.is_locked());
    assert!(MOCK_TRAP_CONTROL.traps_enabled());
}

#[test]
fn test_spin_lock_inside_masked_region() {
    setup();
    let outer = TrapGuard::new();
    let lock = SpinLock::new(());
    let guard = lock.lock();
    assert!(!guard.traps_were_enabled());
    drop(guard);
    // 解锁不会提前打开陷阱
    assert!(!MOCK_TRAP_CONTROL.traps_enabled());
    drop(outer);
    assert!(MOCK_TRAP_CONTROL.traps_enabled());
}

#[test]
fn test_spin_lock_exclusive_access_without_locking() {
    let mut lock = SpinLock::new(std::vec![1, 2]);
    lock.get_mut().push(3);
    assert!(!lock.is_locked());
    assert_eq!(lock.into_inner(), [1, 2, 3]);
}
