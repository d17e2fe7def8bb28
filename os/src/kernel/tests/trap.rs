use uapi::syscall::*;
use uapi::trap::{TRAP_DISK, TRAP_ILLEGAL, TRAP_MATH, TRAP_MEMORY};
use uapi::wait::KILLED_STATUS;

use super::Harness;
use crate::kernel::task::{IDLE_PID, INIT_PID};

fn fault_child(vector: usize, addr: usize) -> (Harness, i32) {
    let mut h = Harness::boot();
    let child = h.fork();
    h.run(child);
    h.ctx.addr = addr;
    h.trap(vector, 0);
    assert_eq!(h.current(), INIT_PID);
    h.assert_frames_conserved();

    let status = h.scratch(INIT_PID);
    assert_eq!(h.call(SYS_WAIT, &[status]), child as i64);
    let code = h.read_i32(INIT_PID, status);
    (h, code)
}

#[test]
fn test_illegal_instruction_kills_process() {
    let (_, status) = fault_child(TRAP_ILLEGAL, 0);
    assert_eq!(status, KILLED_STATUS);
}

#[test]
fn test_math_fault_kills_process() {
    let (_, status) = fault_child(TRAP_MATH, 0);
    assert_eq!(status, KILLED_STATUS);
}

#[test]
fn test_bad_memory_access_kills_process() {
    let (_, status) = fault_child(TRAP_MEMORY, 0x10);
    assert_eq!(status, KILLED_STATUS);
}

#[test]
fn test_memory_fault_below_stack_grows_it() {
    let mut h = Harness::boot();
    let page = h.kernel.config().layout.page_size();
    let low = h.kernel.process(INIT_PID).unwrap().space.stack_low();
    let mapped = h.kernel.process(INIT_PID).unwrap().space.mapped_pages();

    h.ctx.addr = low - page - 8;
    h.trap(TRAP_MEMORY, 0);
    assert_eq!(h.current(), INIT_PID);
    let init = h.kernel.process(INIT_PID).unwrap();
    assert_eq!(init.space.stack_low(), low - 2 * page);
    assert_eq!(init.space.mapped_pages(), mapped + 2);
    h.write_mem(INIT_PID, low - page - 8, b"stack");
    h.assert_frames_conserved();
}

#[test]
fn test_stack_growth_into_red_zone_kills() {
    let mut h = Harness::boot();
    let child = h.fork();
    h.run(child);
    let brk = h.kernel.process(child).unwrap().space.brk();

    // 紧挨着堆顶的一页是红区
    h.ctx.addr = brk + 8;
    h.trap(TRAP_MEMORY, 0);
    assert_eq!(h.current(), INIT_PID);
    assert!(h.kernel.process(child).unwrap().is_zombie());
}

#[test]
fn test_fault_in_idle_is_survivable() {
    let mut h = Harness::boot();
    h.syscall(SYS_DELAY, &[10]);
    assert_eq!(h.current(), IDLE_PID);
    h.trap(TRAP_ILLEGAL, 0);
    h.ctx.addr = 0x10;
    h.trap(TRAP_MEMORY, 0);
    assert_eq!(h.current(), IDLE_PID);
    assert!(h.kernel.process(IDLE_PID).is_some());
}

#[test]
fn test_disk_interrupt_is_harmless() {
    let mut h = Harness::boot();
    h.trap(TRAP_DISK, 3);
    assert_eq!(h.current(), INIT_PID);
}
