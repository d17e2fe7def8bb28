//! 帧分配器模块
//!
//! 本模块提供物理内存帧的分配和跟踪功能。
//!
//! ## 分配策略（位图）
//!
//! 分配器使用位图（bitmap）跟踪每个物理帧的分配状态：
//!
//! - **bitmap**：每个 bit 表示一个物理帧（0=空闲，1=已分配）
//! - 单帧分配总是返回下标最小的空闲帧（first fit），结果可复现
//!
//! 查找时按 u64 字扫描，跳过全满的字，再用 `trailing_ones` 定位空闲位。
//! 释放时直接清除对应 bit，O(1) 操作。
//!
//! ## 不变式
//!
//! 一个帧处于已分配状态，当且仅当它被某个有效页表项引用，或被内核映像保留。
//! 越界下标和重复释放属于内核内部错误，直接 panic。

use alloc::vec;
use alloc::vec::Vec;

use crate::address::Ppn;
use crate::page_table::{PagingError, PagingResult};

const BITS_PER_WORD: usize = u64::BITS as usize;

/// 物理帧池。
/// 采用位图策略跟踪每个物理帧的分配状态。
#[derive(Debug, Clone)]
pub struct FramePool {
    /// 位图数据（每个 bit 表示一个帧：0=空闲，1=已分配）。
    bitmap: Vec<u64>,
    /// 总帧数。
    total_frames: usize,
    /// 已分配帧数（用于快速统计）。
    used_frames: usize,
}

impl FramePool {
    /// 创建一个包含 `total_frames` 个空闲帧的帧池。
    pub fn new(total_frames: usize) -> Self {
        FramePool {
            bitmap: vec![0; total_frames.div_ceil(BITS_PER_WORD)],
            total_frames,
            used_frames: 0,
        }
    }

    /// 总帧数
    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    /// 已分配帧数
    pub fn used_frames(&self) -> usize {
        self.used_frames
    }

    /// 空闲帧数
    pub fn free_frames(&self) -> usize {
        self.total_frames - self.used_frames
    }

    /// 帧是否已分配
    ///
    /// # Panics
    /// 帧号越界时 panic。
    pub fn is_used(&self, ppn: Ppn) -> bool {
        let (word, bit) = self.locate(ppn);
        self.bitmap[word] & (1 << bit) != 0
    }

    /// 分配下标最小的空闲帧。
    pub fn allocate(&mut self) -> PagingResult<Ppn> {
        for (word_idx, word) in self.bitmap.iter_mut().enumerate() {
            if *word == u64::MAX {
                continue;
            }
            let bit = word.trailing_ones() as usize;
            let index = word_idx * BITS_PER_WORD + bit;
            if index >= self.total_frames {
                break;
            }
            *word |= 1 << bit;
            self.used_frames += 1;
            return Ok(Ppn::new(index));
        }
        Err(PagingError::OutOfMemory)
    }

    /// 把指定帧标记为已分配（用于内核映像与内核栈）。
    ///
    /// 帧已被占用时不做任何事，返回 `false`。
    ///
    /// # Panics
    /// 帧号越界时 panic。
    pub fn reserve(&mut self, ppn: Ppn) -> bool {
        let (word, bit) = self.locate(ppn);
        if self.bitmap[word] & (1 << bit) != 0 {
            return false;
        }
        self.bitmap[word] |= 1 << bit;
        self.used_frames += 1;
        true
    }

    /// 释放一个帧。
    ///
    /// # Panics
    /// 帧号越界或帧本来就空闲时 panic。
    pub fn release(&mut self, ppn: Ppn) {
        let (word, bit) = self.locate(ppn);
        if self.bitmap[word] & (1 << bit) == 0 {
            panic!("frame pool: double free of frame {}", ppn);
        }
        self.bitmap[word] &= !(1 << bit);
        self.used_frames -= 1;
    }

    fn locate(&self, ppn: Ppn) -> (usize, usize) {
        let index = ppn.as_usize();
        if index >= self.total_frames {
            panic!(
                "frame pool: frame {} out of range (total {})",
                ppn, self.total_frames
            );
        }
        (index / BITS_PER_WORD, index % BITS_PER_WORD)
    }
}
