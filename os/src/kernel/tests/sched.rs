use alloc::vec::Vec;

use uapi::errno::ERROR;
use uapi::syscall::SYS_DELAY;

use super::Harness;
use crate::kernel::task::{IDLE_PID, INIT_PID, ProcessState};

#[test]
fn test_round_robin_order() {
    let mut h = Harness::boot();
    let a = h.fork();
    let b = h.fork();

    let mut order = Vec::new();
    for _ in 0..6 {
        h.tick();
        order.push(h.current());
    }
    assert_eq!(order, [a, b, INIT_PID, a, b, INIT_PID]);
    assert_eq!(h.kernel.ticks(), 6);
}

#[test]
fn test_single_process_keeps_running() {
    let mut h = Harness::boot();
    for _ in 0..3 {
        h.tick();
        assert_eq!(h.current(), INIT_PID);
    }
    assert_eq!(h.kernel.process(IDLE_PID).unwrap().state, ProcessState::Ready);
}

#[test]
fn test_delay_sleeps_for_ticks() {
    let mut h = Harness::boot();
    let child = h.fork();
    h.syscall(SYS_DELAY, &[2]);
    assert_eq!(h.current(), child);

    h.tick();
    assert_eq!(h.current(), child);
    h.tick();
    assert_eq!(h.current(), INIT_PID);
    assert_eq!(h.ctx.return_value(), 0);
    assert_eq!(h.kernel.ready_queue(), [child]);
}

#[test]
fn test_idle_runs_while_everyone_sleeps() {
    let mut h = Harness::boot();
    h.syscall(SYS_DELAY, &[1]);
    assert_eq!(h.current(), IDLE_PID);
    assert_eq!(h.kernel.process(IDLE_PID).unwrap().state, ProcessState::Running);

    h.tick();
    assert_eq!(h.current(), INIT_PID);
    assert_eq!(h.kernel.process(IDLE_PID).unwrap().state, ProcessState::Ready);
    assert!(h.kernel.ready_queue().is_empty());
}

#[test]
fn test_sleepers_wake_in_sleep_order() {
    let mut h = Harness::boot();
    let child = h.fork();
    h.syscall(SYS_DELAY, &[1]);
    assert_eq!(h.current(), child);
    h.syscall(SYS_DELAY, &[1]);
    assert_eq!(h.current(), IDLE_PID);

    h.tick();
    assert_eq!(h.current(), INIT_PID);
    assert_eq!(h.kernel.ready_queue(), [child]);
}

#[test]
fn test_delay_zero_and_negative() {
    let mut h = Harness::boot();
    assert_eq!(h.call(SYS_DELAY, &[0]), 0);
    assert_eq!(h.current(), INIT_PID);
    assert_eq!(h.call(SYS_DELAY, &[(-1i64) as usize]), ERROR);
    assert_eq!(h.current(), INIT_PID);
}

#[test]
fn test_exit_removes_sleeper() {
    let mut h = Harness::boot();
    let child = h.fork();
    h.run(child);
    h.syscall(SYS_DELAY, &[3]);
    h.run(INIT_PID);

    // 睡眠中的进程被终止
    h.kernel.terminate(child, -1);
    for _ in 0..4 {
        h.tick();
        assert_eq!(h.current(), INIT_PID);
    }
    assert!(h.kernel.process(child).unwrap().is_zombie());
}
