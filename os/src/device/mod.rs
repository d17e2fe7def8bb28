//! 设备模块
//!
//! 目前只有终端。磁盘陷阱只记录日志，没有等待者。

pub mod tty;
