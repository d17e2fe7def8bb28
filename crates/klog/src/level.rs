//! 日志级别
//!
//! 命令行用 0..=5 的数字表示跟踪级别，数字越大输出越详细。

use log::LevelFilter;

/// 默认跟踪级别（Info）
pub const DEFAULT_TRACE_LEVEL: u8 = 3;

/// 把数字跟踪级别转换为 `log` 的级别阈值，超过 5 的值按 5 处理
pub fn level_from_trace(level: u8) -> LevelFilter {
    match level {
        0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
