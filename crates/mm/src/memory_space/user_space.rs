//! 用户地址空间（区域 1）
//!
//! 布局自低向高：代码、数据与 bss、堆（向上增长到 break）、红区、栈（向下增长）。
//! 堆与栈之间始终保留至少一页未映射的红区。

use alloc::vec::Vec;

use super::{map_fresh_pages, unmap_and_release};
use crate::address::{Ppn, Vpn};
use crate::config::MachineLayout;
use crate::page_table::{PageTable, PagingError, PagingResult, Protection};
use crate::phys_mem::PhysMemory;

/// 用户地址空间
#[derive(Debug)]
pub struct UserSpace {
    layout: MachineLayout,
    table: PageTable,
    /// break 的下界（数据段之后的第一页）
    heap_start: usize,
    /// 当前 break
    brk: usize,
    /// 栈的最低已映射地址（页对齐）
    stack_low: usize,
}

impl UserSpace {
    /// 创建一个空的用户地址空间
    pub fn new(layout: MachineLayout) -> Self {
        UserSpace {
            layout,
            table: PageTable::new(layout.region_pages()),
            heap_start: layout.region1_base(),
            brk: layout.region1_base(),
            stack_low: layout.region1_limit(),
        }
    }

    /// 创建只映射了区域顶端 `pages` 页栈的地址空间
    pub fn with_stack(layout: MachineLayout, pages: usize, mem: &mut PhysMemory) -> PagingResult<Self> {
        let mut space = Self::new(layout);
        let low = layout.region1_limit() - pages * layout.page_size();
        space.grow_stack_to(low, mem)?;
        Ok(space)
    }

    /// 区域 1 页表
    pub fn table(&self) -> &PageTable {
        &self.table
    }

    /// 机器布局
    pub fn layout(&self) -> &MachineLayout {
        &self.layout
    }

    /// 当前 break
    pub fn brk(&self) -> usize {
        self.brk
    }

    /// break 的下界
    pub fn heap_start(&self) -> usize {
        self.heap_start
    }

    /// 栈的最低已映射地址
    pub fn stack_low(&self) -> usize {
        self.stack_low
    }

    /// 已映射的页数
    pub fn mapped_pages(&self) -> usize {
        self.table.valid_count()
    }

    /// 为 `[start, end)` 覆盖的页映射新帧，失败时回滚本次映射。
    pub fn map_region(
        &mut self,
        start: usize,
        end: usize,
        prot: Protection,
        mem: &mut PhysMemory,
    ) -> PagingResult<()> {
        if start >= end {
            return Ok(());
        }
        let first = self.vpn_of(start)?;
        let last = self.vpn_of(end - 1)?;
        map_fresh_pages(&mut self.table, first, last.add(1), prot, mem)
    }

    /// 设置堆的起点，同时把 break 放在起点上（加载新程序时使用）。
    pub fn set_heap_start(&mut self, addr: usize) {
        let addr = self.layout.up_to_page(addr);
        self.heap_start = addr;
        self.brk = addr;
    }

    /// 调整用户 break。
    ///
    /// 新 break 低于堆起点，或与栈之间不足一页红区时返回 [`PagingError::InvalidRange`]。
    /// 增长失败时回滚本次映射，break 保持不变。
    pub fn set_brk(&mut self, addr: usize, mem: &mut PhysMemory) -> PagingResult<()> {
        // 先排除栈之上的地址，对齐运算不会溢出
        if addr < self.heap_start || addr > self.stack_low {
            return Err(PagingError::InvalidRange);
        }
        let new_top = self.layout.up_to_page(addr);
        if new_top + self.layout.page_size() > self.stack_low {
            return Err(PagingError::InvalidRange);
        }

        let old_end = self.page_index(self.layout.up_to_page(self.brk));
        let new_end = self.page_index(new_top);
        if new_end > old_end {
            map_fresh_pages(&mut self.table, old_end, new_end, Protection::RW, mem)?;
        } else if new_end < old_end {
            unmap_and_release(&mut self.table, new_end, old_end, mem);
        }
        self.brk = addr;
        Ok(())
    }

    /// 把栈向下扩展到包含 `addr` 的页。
    ///
    /// `addr` 必须位于当前栈底之下，且扩展后与堆之间仍保留一页红区。
    pub fn grow_stack_to(&mut self, addr: usize, mem: &mut PhysMemory) -> PagingResult<()> {
        self.vpn_of(addr)?;
        let new_low = self.layout.down_to_page(addr);
        if new_low >= self.stack_low {
            return Err(PagingError::InvalidRange);
        }
        let heap_top = self.layout.up_to_page(self.brk);
        if new_low < heap_top + self.layout.page_size() {
            return Err(PagingError::InvalidRange);
        }

        let first = self.page_index(new_low);
        let end = self.page_index(self.stack_low);
        map_fresh_pages(&mut self.table, first, end, Protection::RW, mem)?;
        self.stack_low = new_low;
        Ok(())
    }

    /// 为 fork 复制整个地址空间。
    ///
    /// 每个有效页都分配新帧并逐字节复制，保护位不变。
    /// 任何一次分配失败都会释放已复制的帧，父空间与帧池保持原状。
    pub fn clone_for_fork(&self, mem: &mut PhysMemory) -> PagingResult<Self> {
        let mut child = UserSpace {
            layout: self.layout,
            table: PageTable::new(self.table.len()),
            heap_start: self.heap_start,
            brk: self.brk,
            stack_low: self.stack_low,
        };
        let mut copied: Vec<Vpn> = Vec::new();
        for (vpn, entry) in self.table.valid_entries() {
            let frame = match mem.alloc_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    for vpn in copied {
                        if let Some(ppn) = child.table.translate(vpn) {
                            child.table.unmap(vpn);
                            mem.free_frame(ppn);
                        }
                    }
                    return Err(e);
                }
            };
            mem.copy_frame(entry.ppn(), frame);
            child.table.map(vpn, frame, entry.protection());
            copied.push(vpn);
        }
        Ok(child)
    }

    /// 释放所有已映射的帧，页表全部置为无效
    pub fn release_all(&mut self, mem: &mut PhysMemory) {
        let mapped: Vec<(Vpn, Ppn)> = self
            .table
            .valid_entries()
            .map(|(vpn, e)| (vpn, e.ppn()))
            .collect();
        for (vpn, ppn) in mapped {
            self.table.unmap(vpn);
            mem.free_frame(ppn);
        }
        self.brk = self.heap_start;
        self.stack_low = self.layout.region1_limit();
    }

    /// 检查 `[va, va + len)` 的每一页都已映射且具备 `need` 权限，不复制数据
    ///
    /// 长度超过一个区域时直接返回 [`PagingError::InvalidRange`]。
    pub fn check_range(&self, va: usize, len: usize, need: Protection) -> PagingResult<()> {
        if len == 0 {
            return Ok(());
        }
        if len > self.layout.region_size() {
            return Err(PagingError::InvalidRange);
        }
        let last = va.checked_add(len - 1).ok_or(PagingError::InvalidRange)?;
        let mut page = self.layout.down_to_page(va);
        while page <= last {
            self.resolve(page.max(va), need)?;
            page += self.layout.page_size();
        }
        Ok(())
    }

    /// 按用户权限读取字节（要求页可读）
    pub fn read_bytes(&self, mem: &PhysMemory, va: usize, out: &mut [u8]) -> PagingResult<()> {
        let mut done = 0;
        while done < out.len() {
            let cur = va.checked_add(done).ok_or(PagingError::InvalidRange)?;
            let (ppn, off) = self.resolve(cur, Protection::READ)?;
            let take = (out.len() - done).min(self.layout.page_size() - off);
            out[done..done + take].copy_from_slice(&mem.frame(ppn)[off..off + take]);
            done += take;
        }
        Ok(())
    }

    /// 按用户权限写入字节（要求页可写）
    pub fn write_bytes(&self, mem: &mut PhysMemory, va: usize, data: &[u8]) -> PagingResult<()> {
        self.copy_in(mem, va, data, Protection::WRITE)
    }

    /// 以内核身份写入字节，忽略保护位（装载只读代码段时使用）
    pub fn load_bytes(&self, mem: &mut PhysMemory, va: usize, data: &[u8]) -> PagingResult<()> {
        self.copy_in(mem, va, data, Protection::empty())
    }

    /// 读取一个以 NUL 结尾的字符串（不含 NUL），超过 `max` 字节未结束视为非法
    pub fn read_cstr(&self, mem: &PhysMemory, va: usize, max: usize) -> PagingResult<Vec<u8>> {
        let mut bytes = Vec::new();
        let mut byte = [0u8; 1];
        for i in 0..max {
            let cur = va.checked_add(i).ok_or(PagingError::InvalidRange)?;
            self.read_bytes(mem, cur, &mut byte)?;
            if byte[0] == 0 {
                return Ok(bytes);
            }
            bytes.push(byte[0]);
        }
        Err(PagingError::InvalidRange)
    }

    /// 读取一个 8 字节小端机器字
    pub fn read_word(&self, mem: &PhysMemory, va: usize) -> PagingResult<usize> {
        let mut buf = [0u8; 8];
        self.read_bytes(mem, va, &mut buf)?;
        Ok(u64::from_le_bytes(buf) as usize)
    }

    /// 写入一个 8 字节小端机器字
    pub fn write_word(&self, mem: &mut PhysMemory, va: usize, value: usize) -> PagingResult<()> {
        self.write_bytes(mem, va, &(value as u64).to_le_bytes())
    }

    fn copy_in(
        &self,
        mem: &mut PhysMemory,
        va: usize,
        data: &[u8],
        need: Protection,
    ) -> PagingResult<()> {
        let mut done = 0;
        while done < data.len() {
            let cur = va.checked_add(done).ok_or(PagingError::InvalidRange)?;
            let (ppn, off) = self.resolve(cur, need)?;
            let take = (data.len() - done).min(self.layout.page_size() - off);
            mem.frame_mut(ppn)[off..off + take].copy_from_slice(&data[done..done + take]);
            done += take;
        }
        Ok(())
    }

    fn resolve(&self, va: usize, need: Protection) -> PagingResult<(Ppn, usize)> {
        let vpn = self.vpn_of(va)?;
        let entry = self.table.entry(vpn).ok_or(PagingError::InvalidRange)?;
        if !entry.valid() {
            return Err(PagingError::NotMapped);
        }
        if !entry.protection().contains(need) {
            return Err(PagingError::AccessDenied);
        }
        Ok((entry.ppn(), va & (self.layout.page_size() - 1)))
    }

    fn vpn_of(&self, va: usize) -> PagingResult<Vpn> {
        self.layout.region1_vpn(va).ok_or(PagingError::InvalidRange)
    }

    /// 区域 1 内页对齐地址对应的页号（允许等于区域上界）
    fn page_index(&self, aligned: usize) -> Vpn {
        Vpn::new((aligned - self.layout.region1_base()) >> self.layout.page_shift())
    }
}
