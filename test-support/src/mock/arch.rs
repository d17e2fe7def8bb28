//! 硬件相关操作的 Mock 实现

use std::cell::Cell;
use std::collections::VecDeque;

thread_local! {
    static TRAPS_ENABLED: Cell<bool> = const { Cell::new(true) };
}

/// Mock 陷阱控制
///
/// 屏蔽状态按线程保存，并行运行的测试互不干扰。
pub struct MockTrapControl;

impl MockTrapControl {
    pub const fn new() -> Self {
        Self
    }

    /// 屏蔽陷阱，返回之前的状态
    ///
    /// # Safety
    /// 仅用于测试环境。
    pub unsafe fn mask_traps(&self) -> bool {
        TRAPS_ENABLED.with(|t| t.replace(false))
    }

    /// 恢复陷阱状态
    ///
    /// # Safety
    /// 仅用于测试环境。
    pub unsafe fn restore_traps(&self, was_enabled: bool) {
        TRAPS_ENABLED.with(|t| t.set(was_enabled));
    }

    /// 当前线程的陷阱是否开启
    pub fn traps_enabled(&self) -> bool {
        TRAPS_ENABLED.with(|t| t.get())
    }
}

impl Default for MockTrapControl {
    fn default() -> Self {
        Self::new()
    }
}

/// 全局 Mock 实例
pub static MOCK_TRAP_CONTROL: MockTrapControl = MockTrapControl::new();

/// 寄存器个数上限
pub const MOCK_REGISTER_COUNT: usize = 16;

/// Mock 机器
///
/// 记录寄存器写入、终端输出，并允许测试预先放入终端输入。
#[derive(Debug)]
pub struct MockMachine {
    registers: [usize; MOCK_REGISTER_COUNT],
    /// 按时间顺序记录的寄存器写入 `(寄存器编号, 值)`
    pub register_writes: Vec<(usize, usize)>,
    /// 每个终端已发出的数据块
    pub transmitted: Vec<Vec<Vec<u8>>>,
    received: Vec<VecDeque<Vec<u8>>>,
    halted: bool,
}

impl MockMachine {
    /// 创建带有 `terminals` 个终端的机器
    pub fn new(terminals: usize) -> Self {
        Self {
            registers: [0; MOCK_REGISTER_COUNT],
            register_writes: Vec::new(),
            transmitted: vec![Vec::new(); terminals],
            received: vec![VecDeque::new(); terminals],
            halted: false,
        }
    }

    pub fn write_register(&mut self, reg: usize, value: usize) {
        self.registers[reg] = value;
        self.register_writes.push((reg, value));
    }

    pub fn read_register(&self, reg: usize) -> usize {
        self.registers[reg]
    }

    /// 记录一次终端发送
    pub fn tty_transmit(&mut self, tty: usize, data: &[u8]) {
        self.transmitted[tty].push(data.to_vec());
    }

    /// 取出一行已到达的终端输入，返回字节数
    pub fn tty_receive(&mut self, tty: usize, buf: &mut [u8]) -> usize {
        match self.received[tty].pop_front() {
            Some(line) => {
                let n = line.len().min(buf.len());
                buf[..n].copy_from_slice(&line[..n]);
                n
            }
            None => 0,
        }
    }

    /// 模拟终端输入到达（随后测试应投递一次接收陷阱）
    pub fn push_input(&mut self, tty: usize, line: &[u8]) {
        self.received[tty].push_back(line.to_vec());
    }

    /// 某终端已发送内容的拼接
    pub fn output(&self, tty: usize) -> Vec<u8> {
        self.transmitted[tty].concat()
    }

    pub fn halt(&mut self) {
        self.halted = true;
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }
}
