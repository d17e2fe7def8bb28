//! 机器布局配置
//!
//! 模拟机器的虚拟地址空间分为两个等长区域：
//!
//! ```text
//! 0                    region_size            2 * region_size
//! | 区域 0 (内核)       | 区域 1 (用户)         |
//! | text data heap ... stack(2 页) | text data heap ... stack |
//! ```
//!
//! 内核栈固定占用区域 0 顶端的两页。

use core::ops::Range;

use crate::address::Vpn;

/// 页大小的位移
pub const PAGE_SHIFT: u32 = 13;
/// 页大小（8 KiB）
pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;
/// 每个区域的字节数
pub const VMEM_REGION_SIZE: usize = 0x10_0000;
/// 每个区域的页数，也是页表长度上限
pub const MAX_PT_LEN: usize = VMEM_REGION_SIZE >> PAGE_SHIFT;
/// 内核栈页数
const KERNEL_STACK_PAGES: usize = 2;

/// 机器布局
///
/// 只保存两个基本量（页大小位移、每区域页数），其余边界都由它们导出。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineLayout {
    page_shift: u32,
    region_pages: usize,
}

impl MachineLayout {
    /// 创建一个布局。
    ///
    /// # Panics
    /// 每个区域至少需要容纳内核栈和一页其它内容。
    pub const fn new(page_shift: u32, region_pages: usize) -> Self {
        assert!(region_pages > KERNEL_STACK_PAGES);
        Self {
            page_shift,
            region_pages,
        }
    }

    /// 页大小位移
    pub const fn page_shift(&self) -> u32 {
        self.page_shift
    }

    /// 页大小（字节）
    pub const fn page_size(&self) -> usize {
        1 << self.page_shift
    }

    /// 每个区域的页数（页表长度）
    pub const fn region_pages(&self) -> usize {
        self.region_pages
    }

    /// 每个区域的字节数
    pub const fn region_size(&self) -> usize {
        self.region_pages << self.page_shift
    }

    /// 区域 0 起始地址
    pub const fn region0_base(&self) -> usize {
        0
    }

    /// 区域 1 起始地址
    pub const fn region1_base(&self) -> usize {
        self.region_size()
    }

    /// 区域 1 结束地址（不包含）
    pub const fn region1_limit(&self) -> usize {
        2 * self.region_size()
    }

    /// 向下对齐到页边界
    pub const fn down_to_page(&self, addr: usize) -> usize {
        addr & !(self.page_size() - 1)
    }

    /// 向上对齐到页边界
    pub const fn up_to_page(&self, addr: usize) -> usize {
        (addr + self.page_size() - 1) & !(self.page_size() - 1)
    }

    /// 地址所在的绝对页号
    pub const fn page_of(&self, addr: usize) -> usize {
        addr >> self.page_shift
    }

    /// 绝对页号对应的起始地址
    pub const fn page_addr(&self, page: usize) -> usize {
        page << self.page_shift
    }

    /// 区域 0 中内核栈占用的页
    pub const fn kernel_stack_pages(&self) -> Range<usize> {
        self.region_pages - KERNEL_STACK_PAGES..self.region_pages
    }

    /// 内核栈底（最低地址）
    pub const fn kernel_stack_base(&self) -> usize {
        self.page_addr(self.region_pages - KERNEL_STACK_PAGES)
    }

    /// 区域 1 中的地址对应的页号，地址不在区域 1 时返回 `None`
    pub fn region1_vpn(&self, addr: usize) -> Option<Vpn> {
        if addr < self.region1_base() || addr >= self.region1_limit() {
            return None;
        }
        Some(Vpn::new((addr - self.region1_base()) >> self.page_shift))
    }

    /// 区域 1 中页号对应的起始地址
    pub const fn region1_addr(&self, vpn: Vpn) -> usize {
        self.region1_base() + (vpn.as_usize() << self.page_shift)
    }
}

impl Default for MachineLayout {
    fn default() -> Self {
        Self::new(PAGE_SHIFT, MAX_PT_LEN)
    }
}
