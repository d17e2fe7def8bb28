//! 页表项
//!
//! 硬件使用的 32 位打包格式：
//!
//! ```text
//! 31                       8 7    4 3   1 0
//! |        pfn (24)         | 保留 | prot | valid |
//! ```

use bitfield_struct::bitfield;
use bitflags::bitflags;

use crate::address::Ppn;

bitflags! {
    /// 页保护位，内核只负责存储，由硬件检查
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Protection: u8 {
        /// 可读
        const READ = 1 << 0;
        /// 可写
        const WRITE = 1 << 1;
        /// 可执行
        const EXEC = 1 << 2;
    }
}

impl Protection {
    /// 读写（数据、堆、栈）
    pub const RW: Self = Self::READ.union(Self::WRITE);
    /// 读执行（代码段）
    pub const RX: Self = Self::READ.union(Self::EXEC);
}

/// 页表项
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct PageTableEntry {
    /// 有效位 (bit 0)
    pub valid: bool,
    /// 保护位 (bits 1..=3)
    #[bits(3)]
    prot_bits: u8,
    #[bits(4)]
    __: u8,
    /// 物理帧号 (bits 8..=31)
    #[bits(24)]
    pfn: u32,
}

impl PageTableEntry {
    /// 构造一个指向 `ppn` 的有效页表项
    pub fn mapped(ppn: Ppn, prot: Protection) -> Self {
        Self::new()
            .with_valid(true)
            .with_prot_bits(prot.bits())
            .with_pfn(ppn.as_usize() as u32)
    }

    /// 页表项指向的帧
    pub fn ppn(&self) -> Ppn {
        Ppn::new(self.pfn() as usize)
    }

    /// 页表项的保护位
    pub fn protection(&self) -> Protection {
        Protection::from_bits_truncate(self.prot_bits())
    }
}
