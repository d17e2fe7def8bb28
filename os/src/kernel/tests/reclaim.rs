use alloc::vec;

use uapi::errno::ERROR;
use uapi::syscall::*;

use super::Harness;
use crate::kernel::task::{INIT_PID, ProcessState};

#[test]
fn test_reclaim_idle_objects() {
    let mut h = Harness::boot();
    let lock = h.call(SYS_LOCK_INIT, &[]) as usize;
    let cvar = h.call(SYS_CVAR_INIT, &[]) as usize;

    assert_eq!(h.call(SYS_RECLAIM, &[lock]), 0);
    assert_eq!(h.call(SYS_RECLAIM, &[lock]), ERROR);
    assert_eq!(h.call(SYS_LOCK_ACQUIRE, &[lock]), ERROR);
    assert_eq!(h.call(SYS_RECLAIM, &[cvar]), 0);
    assert!(h.kernel.objects().is_empty());

    // 句柄不复用
    assert_eq!(h.call(SYS_LOCK_INIT, &[]), 3);
    assert_eq!(h.call(SYS_RECLAIM, &[0]), ERROR);
}

#[test]
fn test_reclaim_held_lock_is_busy() {
    let mut h = Harness::boot();
    let lock = h.call(SYS_LOCK_INIT, &[]) as usize;
    assert_eq!(h.call(SYS_LOCK_ACQUIRE, &[lock]), 0);
    assert_eq!(h.call(SYS_RECLAIM, &[lock]), ERROR);
    assert_eq!(h.call(SYS_LOCK_RELEASE, &[lock]), 0);
    assert_eq!(h.call(SYS_RECLAIM, &[lock]), 0);
}

#[test]
fn test_reclaim_with_cvar_waiter_is_busy() {
    let mut h = Harness::boot();
    let lock = h.call(SYS_LOCK_INIT, &[]) as usize;
    let cvar = h.call(SYS_CVAR_INIT, &[]) as usize;
    let child = h.fork();

    assert_eq!(h.call(SYS_LOCK_ACQUIRE, &[lock]), 0);
    h.syscall(SYS_CVAR_WAIT, &[cvar, lock]);
    assert_eq!(h.current(), child);

    assert_eq!(h.call(SYS_RECLAIM, &[cvar]), ERROR);
    // 锁没有持有者，但等待者醒来后还要重新获取它
    assert_eq!(h.call(SYS_RECLAIM, &[lock]), ERROR);
    assert_eq!(h.kernel.objects().len(), 2);
}

#[test]
fn test_reclaim_pipe_wakes_readers() {
    let mut h = Harness::boot();
    let pipe = h.call(SYS_PIPE_INIT, &[]) as usize;
    let child = h.fork();
    let buf = h.scratch(INIT_PID);

    h.syscall(SYS_PIPE_READ, &[pipe, buf, 8]);
    assert_eq!(h.current(), child);
    assert_eq!(h.call(SYS_RECLAIM, &[pipe]), 0);
    assert_eq!(h.kernel.process(INIT_PID).unwrap().state, ProcessState::Ready);
    assert_eq!(h.ret(INIT_PID), 0);

    h.run(INIT_PID);
    assert_eq!(h.call(SYS_PIPE_READ, &[pipe, buf, 8]), ERROR);
}

#[test]
fn test_reclaim_pipe_with_blocked_writer_is_busy() {
    let mut h = Harness::boot();
    let pipe = h.call(SYS_PIPE_INIT, &[]) as usize;
    let child = h.fork();
    h.run(child);

    let data = vec![7u8; 300];
    let buf = h.scratch(child);
    h.write_mem(child, buf, &data);
    h.syscall(SYS_PIPE_WRITE, &[pipe, buf, data.len()]);
    assert_eq!(h.current(), INIT_PID);
    assert_eq!(h.call(SYS_RECLAIM, &[pipe]), ERROR);

    let dst = h.scratch(INIT_PID);
    assert_eq!(h.call(SYS_PIPE_READ, &[pipe, dst, 300]), 256);
    assert_eq!(h.ret(child), 300);
    // 缓冲区里还有数据，但没有人阻塞
    assert_eq!(h.call(SYS_RECLAIM, &[pipe]), 0);
}
