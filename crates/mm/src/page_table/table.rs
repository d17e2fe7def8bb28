//! 定长单级页表

use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};

use super::{PageTableEntry, Protection};
use crate::address::{Ppn, Vpn};

/// 页表标识，内核把它写入页表基址寄存器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableId(usize);

impl TableId {
    /// 寄存器中使用的数值
    pub fn as_usize(self) -> usize {
        self.0
    }
}

static NEXT_TABLE_ID: AtomicUsize = AtomicUsize::new(1);

/// 页表
///
/// 长度在创建时固定，下标必须满足 `vpn < len`。
#[derive(Debug)]
pub struct PageTable {
    id: TableId,
    entries: Vec<PageTableEntry>,
}

impl PageTable {
    /// 创建一个所有表项均无效的页表。
    pub fn new(len: usize) -> Self {
        PageTable {
            id: TableId(NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed)),
            entries: vec![PageTableEntry::new(); len],
        }
    }

    /// 页表标识
    pub fn id(&self) -> TableId {
        self.id
    }

    /// 页表长度
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 页表长度是否为 0
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 建立映射 `vpn -> ppn`，不检查原表项。
    ///
    /// # Panics
    /// `vpn` 越界时 panic。
    pub fn map(&mut self, vpn: Vpn, ppn: Ppn, prot: Protection) {
        let slot = self.slot_mut(vpn);
        *slot = PageTableEntry::mapped(ppn, prot);
    }

    /// 使表项无效，不释放帧。
    ///
    /// # Panics
    /// `vpn` 越界时 panic。
    pub fn unmap(&mut self, vpn: Vpn) {
        let slot = self.slot_mut(vpn);
        slot.set_valid(false);
    }

    /// 读取表项，越界返回 `None`
    pub fn entry(&self, vpn: Vpn) -> Option<PageTableEntry> {
        self.entries.get(vpn.as_usize()).copied()
    }

    /// 把页号翻译为帧号，未映射或越界返回 `None`
    pub fn translate(&self, vpn: Vpn) -> Option<Ppn> {
        self.entry(vpn).filter(|e| e.valid()).map(|e| e.ppn())
    }

    /// 页是否已映射
    pub fn is_mapped(&self, vpn: Vpn) -> bool {
        self.translate(vpn).is_some()
    }

    /// 遍历所有有效表项
    pub fn valid_entries(&self) -> impl Iterator<Item = (Vpn, PageTableEntry)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.valid())
            .map(|(i, e)| (Vpn::new(i), *e))
    }

    /// 有效表项个数
    pub fn valid_count(&self) -> usize {
        self.entries.iter().filter(|e| e.valid()).count()
    }

    fn slot_mut(&mut self, vpn: Vpn) -> &mut PageTableEntry {
        let len = self.entries.len();
        match self.entries.get_mut(vpn.as_usize()) {
            Some(slot) => slot,
            None => panic!("page table: vpn {} out of range (len {})", vpn, len),
        }
    }
}
