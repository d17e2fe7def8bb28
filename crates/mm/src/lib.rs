//! 内存管理子系统
//!
//! 面向“双区域分页”模拟机器：区域 0 为内核共享空间，区域 1 为每进程用户空间。
//! 提供页号抽象、物理帧池、模拟物理内存、单级页表以及内核/用户地址空间。
//!
//! # 模块组成
//!
//! - [`address`]: 物理页号 [`Ppn`] 与区域内虚拟页号 [`Vpn`]
//! - [`frame_allocator`]: 位图帧池 [`FramePool`]
//! - [`phys_mem`]: 帧池与帧内容的组合 [`PhysMemory`]
//! - [`page_table`]: 页表项与定长页表
//! - [`memory_space`]: 内核地址空间（brk）与用户地址空间（堆、栈、fork）
//!
//! 机器布局常量由 [`MachineLayout`] 描述，默认值与硬件一致，测试可以缩小。

#![no_std]

extern crate alloc;

mod config;

pub mod address;
pub mod frame_allocator;
pub mod memory_space;
pub mod page_table;
pub mod phys_mem;

pub use address::{Ppn, Vpn};
pub use config::{MAX_PT_LEN, MachineLayout, PAGE_SHIFT, PAGE_SIZE, VMEM_REGION_SIZE};
pub use frame_allocator::FramePool;
pub use memory_space::{KernelSpace, UserSpace};
pub use page_table::{PageTable, PageTableEntry, PagingError, PagingResult, Protection, TableId};
pub use phys_mem::PhysMemory;
