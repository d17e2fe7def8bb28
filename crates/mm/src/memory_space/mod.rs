//! 内存空间模块
//!
//! 本模块定义了两类地址空间：
//!
//! - [`KernelSpace`]：区域 0，内核映像的恒等映射、内核堆（brk）与内核栈
//! - [`UserSpace`]：区域 1，每个进程独占，包含代码、数据、堆与向下增长的栈
//!
//! 两者共享“批量映射新帧，失败时整体回滚”的辅助函数。

mod kernel_space;
mod user_space;

pub use kernel_space::*;
pub use user_space::*;

use crate::address::{Vpn, vpn_range};
use crate::page_table::{PageTable, PagingResult, Protection};
use crate::phys_mem::PhysMemory;

/// 为 `[start, end)` 中的每一页分配一个新帧并映射。
///
/// 任意一次分配失败时，撤销本次调用建立的所有映射并释放对应的帧，
/// 页表与帧池恢复到调用前的状态。
pub(crate) fn map_fresh_pages(
    table: &mut PageTable,
    start: Vpn,
    end: Vpn,
    prot: Protection,
    mem: &mut PhysMemory,
) -> PagingResult<()> {
    for vpn in vpn_range(start, end) {
        match mem.alloc_frame() {
            Ok(ppn) => table.map(vpn, ppn, prot),
            Err(e) => {
                log::debug!(
                    "mm: mapping pages {}..{} failed at {}, rolling back",
                    start,
                    end,
                    vpn
                );
                unmap_and_release(table, start, vpn, mem);
                return Err(e);
            }
        }
    }
    Ok(())
}

/// 解除 `[start, end)` 中所有有效页的映射并释放帧。
pub(crate) fn unmap_and_release(table: &mut PageTable, start: Vpn, end: Vpn, mem: &mut PhysMemory) {
    for vpn in vpn_range(start, end) {
        if let Some(ppn) = table.translate(vpn) {
            table.unmap(vpn);
            mem.free_frame(ppn);
        }
    }
}
