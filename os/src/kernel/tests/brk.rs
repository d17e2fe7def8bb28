use alloc::boxed::Box;

use mm::{MachineLayout, Vpn};
use test_support::mock::arch::MockMachine;
use test_support::mock::loader::MockLoader;
use uapi::errno::ERROR;
use uapi::syscall::SYS_BRK;

use super::{Harness, IMAGE};
use crate::arch::{KernelImage, Register, TlbFlush};
use crate::config::KernelConfig;
use crate::error::KernelError;
use crate::kernel::boot::Bootstrap;
use crate::kernel::task::INIT_PID;

/// 16 页的小机器：内核映像占 0..2 页，内核栈占 14..16 页
fn small_machine() -> (KernelConfig, KernelImage) {
    let layout = MachineLayout::new(13, 16);
    let config = KernelConfig {
        layout,
        pmem_size: 16 * layout.page_size(),
        ..KernelConfig::default()
    };
    let image = KernelImage {
        first_text_page: 0,
        first_data_page: 1,
        orig_brk_page: 2,
    };
    (config, image)
}

fn small_bootstrap() -> (Bootstrap, usize) {
    let (config, image) = small_machine();
    let pmem = config.pmem_size;
    let boot = Bootstrap::new(
        config,
        image,
        Box::new(MockMachine::new(4)),
        Box::new(MockLoader::new()),
    );
    (boot, pmem)
}

#[test]
fn test_kernel_brk_across_vm_enable() {
    let (mut boot, pmem) = small_bootstrap();
    let page = 1 << 13;

    // 开启前只记录
    boot.set_kernel_brk(2 * page + 3 * page).unwrap();
    assert_eq!(boot.kernel_brk(), 5 * page);

    let mut h = Harness::start(boot, pmem, &[]);
    // 保留 4 帧，idle 栈 2 帧，提前推进的堆 3 帧
    assert_eq!(h.kernel.frames().used_frames(), 9);
    h.assert_frames_conserved();

    h.kernel.set_kernel_brk(7 * page).unwrap();
    assert_eq!(h.kernel.frames().used_frames(), 11);
    assert!(h.kernel.kernel_space().table().is_mapped(Vpn::new(6)));
    h.assert_frames_conserved();

    h.exhaust_frames(0);
    assert_eq!(
        h.kernel.set_kernel_brk(8 * page),
        Err(KernelError::OutOfMemory)
    );
    assert_eq!(h.kernel.kernel_space().brk(), 7 * page);
    assert!(!h.kernel.kernel_space().table().is_mapped(Vpn::new(7)));
}

#[test]
fn test_kernel_brk_growth_rolls_back() {
    let (boot, pmem) = small_bootstrap();
    let page = 1 << 13;
    let mut h = Harness::start(boot, pmem, &[]);
    let free = h.kernel.frames().free_frames();
    let valid = h.kernel.kernel_space().table().valid_count();

    // 需要 12 帧，只剩 10 帧
    assert_eq!(free, 10);
    assert_eq!(
        h.kernel.set_kernel_brk(14 * page),
        Err(KernelError::OutOfMemory)
    );
    assert_eq!(h.kernel.frames().free_frames(), free);
    assert_eq!(h.kernel.kernel_space().table().valid_count(), valid);
    assert_eq!(h.kernel.kernel_space().brk(), 2 * page);
}

#[test]
fn test_kernel_brk_rejects_bad_ranges() {
    let (boot, pmem) = small_bootstrap();
    let page = 1 << 13;
    let mut h = Harness::start(boot, pmem, &[]);

    assert_eq!(
        h.kernel.set_kernel_brk(page),
        Err(KernelError::InvalidRange)
    );
    assert_eq!(
        h.kernel.set_kernel_brk(14 * page + 1),
        Err(KernelError::InvalidRange)
    );
    assert_eq!(
        h.kernel.set_kernel_brk(usize::MAX),
        Err(KernelError::InvalidRange)
    );
    assert_eq!(h.kernel.kernel_space().brk(), 2 * page);
}

#[test]
fn test_kernel_brk_shrink_releases_and_flushes() {
    let (boot, pmem) = small_bootstrap();
    let page = 1 << 13;
    let mut h = Harness::start(boot, pmem, &[]);
    let used = h.kernel.frames().used_frames();

    h.kernel.set_kernel_brk(4 * page + 8).unwrap();
    assert_eq!(h.kernel.frames().used_frames(), used + 3);
    h.kernel.set_kernel_brk(3 * page).unwrap();
    assert_eq!(h.kernel.frames().used_frames(), used + 1);
    assert_eq!(
        h.machine().register_writes.last(),
        Some(&(Register::TlbFlush as usize, TlbFlush::Region0.encode()))
    );
    h.assert_frames_conserved();
}

#[test]
fn test_boot_early_brk_beyond_memory_is_recorded_only() {
    let (mut boot, _) = small_bootstrap();
    let page = 1 << 13;
    boot.set_kernel_brk(10 * page).unwrap();
    assert_eq!(boot.set_kernel_brk(page), Err(KernelError::InvalidRange));
    assert_eq!(boot.kernel_brk(), 10 * page);
}

#[test]
fn test_user_brk_grows_and_shrinks() {
    let mut h = Harness::boot();
    let page = h.kernel.config().layout.page_size();
    let (heap_start, mapped) = {
        let init = h.kernel.process(INIT_PID).unwrap();
        (init.space.heap_start(), init.space.mapped_pages())
    };
    assert_eq!(heap_start, h.kernel.config().layout.region1_base() + 2 * page);

    assert_eq!(h.call(SYS_BRK, &[heap_start + 3 * page - 1]), 0);
    assert_eq!(h.kernel.process(INIT_PID).unwrap().space.mapped_pages(), mapped + 3);
    h.write_mem(INIT_PID, heap_start + 2 * page, b"heap");
    h.assert_frames_conserved();

    assert_eq!(h.call(SYS_BRK, &[heap_start + page]), 0);
    assert_eq!(h.kernel.process(INIT_PID).unwrap().space.mapped_pages(), mapped + 1);
    assert!(h.kernel.copy_from_user(INIT_PID, heap_start + 2 * page, 4).is_err());
    assert_eq!(
        h.machine().register_writes.last(),
        Some(&(Register::TlbFlush as usize, TlbFlush::Region1.encode()))
    );
    h.assert_frames_conserved();
}

#[test]
fn test_user_brk_keeps_red_zone() {
    let mut h = Harness::boot();
    let page = h.kernel.config().layout.page_size();
    let stack_low = h.kernel.process(INIT_PID).unwrap().space.stack_low();
    let heap_start = h.kernel.process(INIT_PID).unwrap().space.heap_start();

    assert_eq!(h.call(SYS_BRK, &[stack_low - page + 1]), ERROR);
    assert_eq!(h.call(SYS_BRK, &[heap_start - 1]), ERROR);
    assert_eq!(h.call(SYS_BRK, &[stack_low - page]), 0);
    assert_eq!(h.kernel.process(INIT_PID).unwrap().space.brk(), stack_low - page);
    h.assert_frames_conserved();
}

#[test]
fn test_user_brk_far_beyond_region_is_rejected() {
    let mut h = Harness::boot();
    let brk = h.kernel.process(INIT_PID).unwrap().space.brk();
    let mapped = h.kernel.process(INIT_PID).unwrap().space.mapped_pages();

    assert_eq!(h.call(SYS_BRK, &[usize::MAX]), ERROR);
    assert_eq!(h.call(SYS_BRK, &[usize::MAX - 1]), ERROR);
    assert_eq!(h.current(), INIT_PID);
    let init = h.kernel.process(INIT_PID).unwrap();
    assert_eq!(init.space.brk(), brk);
    assert_eq!(init.space.mapped_pages(), mapped);
}

#[test]
fn test_user_brk_out_of_memory_rolls_back() {
    let mut h = Harness::boot();
    let page = h.kernel.config().layout.page_size();
    let heap_start = h.kernel.process(INIT_PID).unwrap().space.heap_start();
    let mapped = h.kernel.process(INIT_PID).unwrap().space.mapped_pages();

    h.exhaust_frames(2);
    assert_eq!(h.call(SYS_BRK, &[heap_start + 5 * page]), ERROR);
    assert_eq!(h.kernel.frames().free_frames(), 2);
    let init = h.kernel.process(INIT_PID).unwrap();
    assert_eq!(init.space.brk(), heap_start);
    assert_eq!(init.space.mapped_pages(), mapped);
}

#[test]
fn test_default_image_is_used_by_harness() {
    // 默认布局下，内核映像之后第一页没有映射
    let h = Harness::boot();
    assert!(!h.kernel.kernel_space().table().is_mapped(Vpn::new(IMAGE.orig_brk_page)));
    assert_eq!(
        h.kernel.kernel_space().orig_brk(),
        h.kernel.config().layout.page_addr(IMAGE.orig_brk_page)
    );
}
