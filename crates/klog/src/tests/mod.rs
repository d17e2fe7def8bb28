// Unit tests for klog.
//
// 这些测试只覆盖纯函数（格式化、级别映射），不安装全局 logger，
// 因此可以和其它测试并行运行。

extern crate alloc;

use alloc::string::String;
use log::Level;

use crate::format_entry;

/// Test-only formatting helper
macro_rules! test_format {
    ($ticks:expr, $level:expr, $pid:expr, $target:expr, $($arg:tt)*) => {{
        let mut s = String::new();
        format_entry(&mut s, $ticks, $level, $pid, $target, format_args!($($arg)*)).unwrap();
        s
    }};
}
