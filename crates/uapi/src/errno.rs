//! 系统调用返回值约定
//!
//! 成功时返回非负值，任何失败都返回同一个哨兵值。

/// 所有失败系统调用的返回值。
pub const ERROR: i64 = -1;

/// 无其它返回值的成功系统调用返回 0。
pub const SUCCESS: i64 = 0;
