//! 为 test-support 的 mock 类型实现硬件 trait

use alloc::string::String;
use core::any::Any;

use test_support::mock::arch::MockMachine;
use test_support::mock::loader::MockLoader;

use super::{Hardware, LoadError, ProgramImage, ProgramLoader, Register};

impl Hardware for MockMachine {
    fn write_register(&mut self, reg: Register, value: usize) {
        MockMachine::write_register(self, reg as usize, value);
    }

    fn read_register(&self, reg: Register) -> usize {
        MockMachine::read_register(self, reg as usize)
    }

    fn tty_transmit(&mut self, tty: usize, data: &[u8]) {
        MockMachine::tty_transmit(self, tty, data);
    }

    fn tty_receive(&mut self, tty: usize, buf: &mut [u8]) -> usize {
        MockMachine::tty_receive(self, tty, buf)
    }

    fn halt(&mut self) {
        MockMachine::halt(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ProgramLoader for MockLoader {
    fn load(&mut self, name: &str, args: &[String]) -> Result<ProgramImage, LoadError> {
        let image = self.find(name, args).ok_or(LoadError::NotFound)?;
        Ok(ProgramImage {
            text: image.text,
            data: image.data,
            bss_len: image.bss_len,
            entry_offset: image.entry_offset,
        })
    }
}
