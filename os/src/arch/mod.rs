//! 硬件抽象层
//!
//! 内核只通过本模块描述的接口与模拟硬件交互：
//! - [`Hardware`]：寄存器读写、终端收发、停机
//! - [`UserContext`]：每次陷阱由硬件交给内核的用户态快照
//! - [`ProgramLoader`]：按名字装载用户程序映像
//!
//! 硬件、装载器的具体实现在内核之外（模拟器可执行文件或测试 mock）。

mod context;
mod loader;
#[cfg(test)]
mod mock_impl;

pub use context::{NUM_REGS, UserContext};
pub use loader::{LoadError, ProgramImage, ProgramLoader};

use core::any::Any;
use core::sync::atomic::{AtomicBool, Ordering};

/// 硬件寄存器
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    /// 陷阱向量表基址
    VectorBase = 0,
    /// 区域 0 页表基址
    Ptbr0 = 1,
    /// 区域 0 页表长度
    Ptlr0 = 2,
    /// 区域 1 页表基址
    Ptbr1 = 3,
    /// 区域 1 页表长度
    Ptlr1 = 4,
    /// 虚拟内存开关
    VmEnable = 5,
    /// 写入即刷新 TLB，值见 [`TlbFlush`]
    TlbFlush = 6,
}

/// TLB 刷新范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlbFlush {
    /// 全部
    All,
    /// 区域 0
    Region0,
    /// 区域 1
    Region1,
    /// 单个页（任意页内地址）
    Page(usize),
}

impl TlbFlush {
    /// 写入 [`Register::TlbFlush`] 的数值
    pub fn encode(self) -> usize {
        match self {
            TlbFlush::All => usize::MAX,
            TlbFlush::Region0 => usize::MAX - 1,
            TlbFlush::Region1 => usize::MAX - 2,
            TlbFlush::Page(addr) => addr,
        }
    }
}

/// 模拟硬件接口
pub trait Hardware: Send {
    /// 写特权寄存器
    fn write_register(&mut self, reg: Register, value: usize);
    /// 读特权寄存器
    fn read_register(&self, reg: Register) -> usize;
    /// 开始向终端发送一块数据，完成后硬件产生发送完成陷阱
    fn tty_transmit(&mut self, tty: usize, data: &[u8]);
    /// 取出终端已收到的一行，返回字节数
    fn tty_receive(&mut self, tty: usize, buf: &mut [u8]) -> usize;
    /// 停机
    fn halt(&mut self);
    /// 供测试和模拟器向下转型
    fn as_any(&self) -> &dyn Any;
    /// 供测试和模拟器向下转型
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// 内核映像的页边界，由链接器给出
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelImage {
    /// 代码段第一页
    pub first_text_page: usize,
    /// 数据段第一页
    pub first_data_page: usize,
    /// 原始 break 所在页（映像之后的第一页）
    pub orig_brk_page: usize,
}

// ============================================================================
// sync crate 的陷阱屏蔽实现
// ============================================================================

/// 陷阱投递开关
///
/// 模拟硬件只在内核未屏蔽陷阱时才调用陷阱入口。
struct SyncTrapControl {
    enabled: AtomicBool,
}

impl sync::TrapControl for SyncTrapControl {
    unsafe fn mask_traps(&self) -> bool {
        self.enabled.swap(false, Ordering::AcqRel)
    }

    unsafe fn restore_traps(&self, was_enabled: bool) {
        self.enabled.store(was_enabled, Ordering::Release);
    }
}

/// 全局陷阱控制实例
static SYNC_TRAP_CONTROL: SyncTrapControl = SyncTrapControl {
    enabled: AtomicBool::new(true),
};

/// 初始化 sync crate 的陷阱控制
///
/// # Safety
/// 必须在单线程环境下调用
pub unsafe fn init_sync_trap_control() {
    unsafe { sync::register_trap_control(&SYNC_TRAP_CONTROL) };
}

/// 当前是否允许投递陷阱
pub fn traps_enabled() -> bool {
    SYNC_TRAP_CONTROL.enabled.load(Ordering::Acquire)
}
