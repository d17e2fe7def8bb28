//! Wait 相关常量

/// 因非法指令、内存或算术异常被内核终止的进程的退出状态。
pub const KILLED_STATUS: i32 = -1;
