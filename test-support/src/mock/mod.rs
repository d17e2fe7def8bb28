//! Mock 实现模块
//!
//! 提供硬件、陷阱控制和程序装载器的 Mock 实现，用于测试

pub mod arch;
pub mod loader;
