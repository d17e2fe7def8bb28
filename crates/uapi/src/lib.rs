//! 与用户空间共用定义和声明
//!
//! 包含系统调用号、返回值约定、陷阱原因编号和各类长度上限，
//! 确保内核和用户程序对 ABI 的理解一致。

#![no_std]
#![allow(dead_code)]
// 调用号与陷阱编号是一张张常量表，逐项补 `///` 噪声较大。
#![allow(missing_docs)]

pub mod errno;
pub mod limits;
pub mod syscall;
pub mod trap;
pub mod wait;
