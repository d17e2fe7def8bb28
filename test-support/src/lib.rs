//! 测试支持 crate
//!
//! 提供模拟硬件、模拟程序装载器和陷阱屏蔽的 Mock 实现。
//!
//! 这里不依赖内核的任何 crate（避免循环依赖）；
//! 被测 crate 在 `cfg(test)` 下为这些类型实现自己的 trait。

pub mod mock;
