//! DuOS - 面向双区域分页模拟机器的最小内核
//!
//! 内核把物理内存纳入虚拟内存管理，维护用户进程的生命周期，
//! 并分发硬件陷阱与系统调用：内存分配、fork/exec/exit/wait，
//! 以及基于锁、条件变量、管道和终端的阻塞同步。
//!
//! # 模块组成
//!
//! - [`arch`]: 硬件接口（寄存器、用户上下文、程序装载器）
//! - [`kernel`]: 内核状态、启动流程、陷阱与系统调用、进程与调度
//! - [`ipc`]: 锁、条件变量、管道
//! - [`device`]: 终端
//! - [`entry`]: 硬件调用的入口函数
//! - [`logging`]: 日志上下文与注册
//!
//! 内存管理在 `mm` crate，日志实现在 `klog` crate，自旋锁在 `sync` crate。

#![no_std]

extern crate alloc;

pub mod arch;
pub mod config;
pub mod device;
pub mod entry;
pub mod error;
pub mod ipc;
pub mod kernel;
pub mod logging;

pub use error::{KernelError, KernelResult};
pub use kernel::Kernel;
