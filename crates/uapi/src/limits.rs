//! 内核对象与设备的长度上限

/// 终端个数
pub const NUM_TERMINALS: usize = 4;

/// 单次终端收发的最大字节数（一行）
pub const TERMINAL_MAX_LINE: usize = 1024;

/// 管道缓冲区容量（字节）
pub const PIPE_BUFFER_LEN: usize = 256;

/// Exec 参数向量的最大项数
pub const MAX_ARGS: usize = 64;

/// 从用户空间读取的单个字符串的最大长度（含结尾 NUL）
pub const MAX_STRING_LEN: usize = 4096;
