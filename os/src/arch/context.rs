//! 用户上下文

/// 通用寄存器个数
pub const NUM_REGS: usize = 8;

/// 陷阱发生时硬件保存的用户态快照
///
/// 系统调用约定：`code` 是调用号，参数依次在 `regs[0..]`，返回值写回 `regs[0]`。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserContext {
    /// 陷阱原因编号
    pub vector: usize,
    /// 附加代码（系统调用号、终端号等）
    pub code: usize,
    /// 出错地址（内存陷阱）
    pub addr: usize,
    /// 程序计数器
    pub pc: usize,
    /// 栈指针
    pub sp: usize,
    /// 通用寄存器
    pub regs: [usize; NUM_REGS],
}

impl UserContext {
    /// 第 `i` 个系统调用参数
    pub fn arg(&self, i: usize) -> usize {
        self.regs[i]
    }

    /// 按有符号数解释的第 `i` 个参数
    pub fn signed_arg(&self, i: usize) -> i64 {
        self.regs[i] as i64
    }

    /// 写入系统调用返回值
    pub fn set_return(&mut self, value: i64) {
        self.regs[0] = value as usize;
    }

    /// 读取系统调用返回值
    pub fn return_value(&self) -> i64 {
        self.regs[0] as i64
    }
}
