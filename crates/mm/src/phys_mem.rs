//! 模拟物理内存
//!
//! 物理内存由帧池和帧内容两部分组成：帧池负责记账，字节数组保存帧中的数据。
//! 所有对帧的分配、释放、读写都经过 [`PhysMemory`]，
//! 这样新分配的帧总是清零的，fork 也能按字节复制页内容。

use alloc::vec;
use alloc::vec::Vec;

use crate::address::Ppn;
use crate::config::MachineLayout;
use crate::frame_allocator::FramePool;
use crate::page_table::PagingResult;

/// 物理内存
#[derive(Debug)]
pub struct PhysMemory {
    pool: FramePool,
    bytes: Vec<u8>,
    page_size: usize,
}

impl PhysMemory {
    /// 按物理内存大小创建，帧数为 `size / page_size`（向下取整）。
    pub fn new(layout: &MachineLayout, size: usize) -> Self {
        let page_size = layout.page_size();
        let frames = size / page_size;
        PhysMemory {
            pool: FramePool::new(frames),
            bytes: vec![0; frames * page_size],
            page_size,
        }
    }

    /// 帧池（只读）
    pub fn pool(&self) -> &FramePool {
        &self.pool
    }

    /// 帧池（可写），用于启动时保留内核映像帧
    pub fn pool_mut(&mut self) -> &mut FramePool {
        &mut self.pool
    }

    /// 分配一个清零的帧
    pub fn alloc_frame(&mut self) -> PagingResult<Ppn> {
        let ppn = self.pool.allocate()?;
        self.frame_mut(ppn).fill(0);
        Ok(ppn)
    }

    /// 释放一个帧
    pub fn free_frame(&mut self, ppn: Ppn) {
        self.pool.release(ppn);
    }

    /// 帧内容
    pub fn frame(&self, ppn: Ppn) -> &[u8] {
        let start = ppn.as_usize() * self.page_size;
        &self.bytes[start..start + self.page_size]
    }

    /// 帧内容（可写）
    pub fn frame_mut(&mut self, ppn: Ppn) -> &mut [u8] {
        let start = ppn.as_usize() * self.page_size;
        &mut self.bytes[start..start + self.page_size]
    }

    /// 把 `src` 帧的全部内容复制到 `dst` 帧
    pub fn copy_frame(&mut self, src: Ppn, dst: Ppn) {
        let from = src.as_usize() * self.page_size;
        let to = dst.as_usize() * self.page_size;
        self.bytes.copy_within(from..from + self.page_size, to);
    }
}
