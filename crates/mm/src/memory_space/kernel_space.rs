//! 内核地址空间（区域 0）

use core::ops::Range;

use super::{map_fresh_pages, unmap_and_release};
use crate::address::{Ppn, Vpn, vpn_range};
use crate::config::MachineLayout;
use crate::page_table::{PageTable, PagingError, PagingResult, Protection};
use crate::phys_mem::PhysMemory;

/// 内核地址空间
///
/// 启动时内核映像被恒等映射（页号等于帧号），之后只有内核堆会变化。
/// 在虚拟内存开启之前，设置 brk 只记录新值；开启之后才真正映射或解除映射。
#[derive(Debug)]
pub struct KernelSpace {
    layout: MachineLayout,
    table: PageTable,
    /// 启动时原始 break 所在页的起始地址，内核堆不能收缩到它以下
    orig_brk: usize,
    brk: usize,
    vm_enabled: bool,
}

impl KernelSpace {
    /// 创建内核地址空间，`orig_brk_page` 是内核映像之后的第一页。
    pub fn new(layout: MachineLayout, orig_brk_page: usize) -> Self {
        let orig_brk = layout.page_addr(orig_brk_page);
        KernelSpace {
            layout,
            table: PageTable::new(layout.region_pages()),
            orig_brk,
            brk: orig_brk,
            vm_enabled: false,
        }
    }

    /// 区域 0 页表
    pub fn table(&self) -> &PageTable {
        &self.table
    }

    /// 当前 break
    pub fn brk(&self) -> usize {
        self.brk
    }

    /// 原始 break
    pub fn orig_brk(&self) -> usize {
        self.orig_brk
    }

    /// 虚拟内存是否已开启
    pub fn vm_enabled(&self) -> bool {
        self.vm_enabled
    }

    /// 标记虚拟内存已开启，此后的 brk 调用会真正修改映射。
    pub fn enable_vm(&mut self) {
        self.vm_enabled = true;
    }

    /// 恒等映射一段页（帧必须已由调用者保留）
    pub fn identity_map(&mut self, pages: Range<usize>, prot: Protection) {
        for page in pages {
            self.table.map(Vpn::new(page), Ppn::new(page), prot);
        }
    }

    /// 为开启虚拟内存之前推进的 break 补建映射。
    ///
    /// 原始 break 与当前 break 之间的每一页分配一个新帧。
    pub fn map_early_heap(&mut self, mem: &mut PhysMemory) -> PagingResult<()> {
        let start = Vpn::new(self.layout.page_of(self.orig_brk));
        let end = Vpn::new(self.layout.page_of(self.layout.up_to_page(self.brk)));
        if start >= end {
            return Ok(());
        }
        // 开启之前可能已经有一部分页被映射过，只补缺的
        for vpn in vpn_range(start, end) {
            if !self.table.is_mapped(vpn) {
                map_fresh_pages(&mut self.table, vpn, vpn.add(1), Protection::RW, mem)?;
            }
        }
        Ok(())
    }

    /// 开启虚拟内存之前记录新的 break，不分配任何帧。
    ///
    /// 开启之后调用与 [`KernelSpace::set_brk`] 的检查相同，但同样只记录，
    /// 因此只应在启动阶段使用。
    pub fn record_brk(&mut self, addr: usize) -> PagingResult<()> {
        self.check_brk(addr)?;
        log::trace!("mm: kernel brk recorded {:#x} -> {:#x}", self.brk, addr);
        self.brk = addr;
        Ok(())
    }

    fn check_brk(&self, addr: usize) -> PagingResult<()> {
        let stack = self.layout.kernel_stack_base();
        if addr < self.orig_brk || addr > stack || self.layout.up_to_page(addr) > stack {
            return Err(PagingError::InvalidRange);
        }
        Ok(())
    }

    /// 调整内核 break。
    ///
    /// 新 break 不能低于原始 break，也不能进入内核栈。
    /// 增长失败时回滚本次映射的所有页，break 保持不变。
    pub fn set_brk(&mut self, addr: usize, mem: &mut PhysMemory) -> PagingResult<()> {
        if !self.vm_enabled {
            return self.record_brk(addr);
        }
        self.check_brk(addr)?;

        let old_end = Vpn::new(self.layout.page_of(self.layout.up_to_page(self.brk)));
        let new_end = Vpn::new(self.layout.page_of(self.layout.up_to_page(addr)));
        if new_end > old_end {
            map_fresh_pages(&mut self.table, old_end, new_end, Protection::RW, mem)?;
        } else if new_end < old_end {
            unmap_and_release(&mut self.table, new_end, old_end, mem);
        }
        log::trace!("mm: kernel brk {:#x} -> {:#x}", self.brk, addr);
        self.brk = addr;
        Ok(())
    }
}
