//! 宿主机上的模拟硬件
//!
//! - [`SimMachine`]：寄存器堆、终端（输出写到 stdout，输入来自命令行）、停机标志
//! - [`ElfLoader`]：从宿主文件系统读取 ELF，可执行段作为代码段，可写段作为数据段
//! - [`StderrOutput`]：内核日志输出

use std::any::Any;
use std::collections::VecDeque;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use duos::arch::{Hardware, LoadError, ProgramImage, ProgramLoader, Register};
use duos::logging::LogOutput;
use xmas_elf::ElfFile;
use xmas_elf::program::Type;

/// 需要以陷阱形式投递给内核的设备事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    /// 终端收到一行
    Received(usize),
    /// 终端发送完成
    Transmitted(usize),
}

/// 设备事件队列，由模拟硬件写入、驱动循环取出
pub type EventQueue = Arc<Mutex<VecDeque<DeviceEvent>>>;

/// 模拟机器
pub struct SimMachine {
    registers: [usize; 8],
    input: Vec<VecDeque<Vec<u8>>>,
    events: EventQueue,
    halted: Arc<AtomicBool>,
}

impl SimMachine {
    /// 创建机器，`input` 中的每一行都会在终端 0 上产生一次接收事件
    pub fn new(terminals: usize, input: &[String]) -> Self {
        let mut queues = vec![VecDeque::new(); terminals];
        let events: EventQueue = Arc::default();
        if let Some(tty0) = queues.first_mut() {
            let mut pending = events.lock().unwrap_or_else(|e| e.into_inner());
            for line in input {
                let mut bytes = line.as_bytes().to_vec();
                bytes.push(b'\n');
                tty0.push_back(bytes);
                pending.push_back(DeviceEvent::Received(0));
            }
        }
        SimMachine {
            registers: [0; 8],
            input: queues,
            events,
            halted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 设备事件队列
    pub fn events(&self) -> EventQueue {
        self.events.clone()
    }

    /// 停机标志
    pub fn halted(&self) -> Arc<AtomicBool> {
        self.halted.clone()
    }

    fn push_event(&self, event: DeviceEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(event);
    }
}

impl Hardware for SimMachine {
    fn write_register(&mut self, reg: Register, value: usize) {
        log::trace!("sim: {:?} <- {:#x}", reg, value);
        self.registers[reg as usize] = value;
    }

    fn read_register(&self, reg: Register) -> usize {
        self.registers[reg as usize]
    }

    fn tty_transmit(&mut self, tty: usize, data: &[u8]) {
        let mut stdout = std::io::stdout().lock();
        if tty != 0 {
            let _ = write!(stdout, "[tty{}] ", tty);
        }
        let _ = stdout.write_all(data);
        let _ = stdout.flush();
        self.push_event(DeviceEvent::Transmitted(tty));
    }

    fn tty_receive(&mut self, tty: usize, buf: &mut [u8]) -> usize {
        let Some(line) = self.input.get_mut(tty).and_then(|q| q.pop_front()) else {
            return 0;
        };
        let n = line.len().min(buf.len());
        buf[..n].copy_from_slice(&line[..n]);
        n
    }

    fn halt(&mut self) {
        self.halted.store(true, Ordering::Release);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// 从宿主文件系统装载 ELF 程序
pub struct ElfLoader;

impl ProgramLoader for ElfLoader {
    fn load(&mut self, name: &str, _args: &[String]) -> Result<ProgramImage, LoadError> {
        let bytes = std::fs::read(name).map_err(|_| LoadError::NotFound)?;
        parse_elf(&bytes)
    }
}

/// 把 ELF 的 LOAD 段拆成代码段与数据段
fn parse_elf(bytes: &[u8]) -> Result<ProgramImage, LoadError> {
    let elf = ElfFile::new(bytes).map_err(|e| LoadError::Malformed(e.to_string()))?;
    let mut image = ProgramImage::default();
    let mut text_vaddr = None;

    for ph in elf.program_iter() {
        if ph.get_type() != Ok(Type::Load) {
            continue;
        }
        let start = ph.offset() as usize;
        let end = start + ph.file_size() as usize;
        let contents = bytes
            .get(start..end)
            .ok_or_else(|| LoadError::Malformed(format!("segment {:#x}..{:#x} out of file", start, end)))?;
        if ph.flags().is_execute() {
            if text_vaddr.is_some() {
                return Err(LoadError::Malformed("more than one text segment".into()));
            }
            text_vaddr = Some(ph.virtual_addr() as usize);
            image.text = contents.to_vec();
        } else if ph.flags().is_write() {
            image.data.extend_from_slice(contents);
            image.bss_len += (ph.mem_size() - ph.file_size()) as usize;
        }
    }

    let text_vaddr = text_vaddr.ok_or_else(|| LoadError::Malformed("no text segment".into()))?;
    image.entry_offset = (elf.header.pt2.entry_point() as usize)
        .checked_sub(text_vaddr)
        .ok_or_else(|| LoadError::Malformed("entry point below text".into()))?;
    Ok(image)
}

/// 日志输出到 stderr
pub struct StderrOutput;

impl LogOutput for StderrOutput {
    fn write_str(&self, s: &str) {
        let _ = std::io::stderr().write_all(s.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_lines_queue_receive_events() {
        let mut machine = SimMachine::new(2, &["ls".to_string(), "exit".to_string()]);
        let events = machine.events();
        assert_eq!(events.lock().unwrap().len(), 2);

        let mut buf = [0u8; 16];
        let n = machine.tty_receive(0, &mut buf);
        assert_eq!(&buf[..n], b"ls\n");
        assert_eq!(machine.tty_receive(1, &mut buf), 0);
    }

    #[test]
    fn test_garbage_is_not_an_elf() {
        assert!(matches!(parse_elf(b"not an elf"), Err(LoadError::Malformed(_))));
    }
}
