//! 终端读写
//!
//! 写者按 FIFO 服务，同一终端同时只有一块数据在发送；
//! 每块不超过一行上限，最后一块发送完成后写者才被唤醒。
//! 读者按 FIFO 服务，一次读取不会跨越输入行。

use alloc::vec;

use super::{Outcome, length_arg};
use crate::device::tty::Transmission;
use crate::error::{KernelError, KernelResult};
use crate::kernel::Kernel;
use crate::kernel::task::BlockOn;

impl Kernel {
    pub(crate) fn sys_tty_read(&mut self, tty: usize, buf: usize, len: i64) -> KernelResult<Outcome> {
        let pid = self.current_pid();
        let len = length_arg(len)?;
        let terminal = self.ttys.get_mut(tty).ok_or(KernelError::InvalidIndex)?;
        if len == 0 {
            return Ok(Outcome::Return(0));
        }
        if terminal.has_input() && terminal.readers.is_empty() {
            self.probe_user(pid, buf, len)?;
            let data = self.ttys[tty].take_input(len);
            self.copy_to_user(pid, buf, &data)?;
            return Ok(Outcome::Return(data.len() as i64));
        }

        self.probe_user(pid, buf, len)?;
        self.ttys[tty].readers.push_back(pid);
        self.block_current(BlockOn::TtyRead { tty, buf, len });
        Ok(Outcome::Blocked)
    }

    pub(crate) fn sys_tty_write(&mut self, tty: usize, buf: usize, len: i64) -> KernelResult<Outcome> {
        let pid = self.current_pid();
        let len = length_arg(len)?;
        if tty >= self.ttys.len() {
            return Err(KernelError::InvalidIndex);
        }
        if len == 0 {
            return Ok(Outcome::Return(0));
        }
        let data = self.copy_from_user(pid, buf, len)?;

        self.ttys[tty].writers.push_back(pid);
        self.block_current(BlockOn::TtyWrite { tty, data, sent: 0 });
        if self.ttys[tty].in_flight.is_none() {
            self.start_transmit(tty);
        }
        Ok(Outcome::Blocked)
    }

    /// 为队首写者发送下一块数据
    fn start_transmit(&mut self, tty: usize) {
        let max_line = self.config.terminal_max_line;
        while let Some(&writer) = self.ttys[tty].writers.front() {
            let Some(BlockOn::TtyWrite { data, sent, .. }) =
                self.procs.get(&writer).and_then(|p| p.blocked_on())
            else {
                self.ttys[tty].writers.pop_front();
                continue;
            };
            let end = data.len().min(sent + max_line);
            let chunk = &data[*sent..end];
            self.ttys[tty].in_flight = Some(Transmission {
                pid: writer,
                len: chunk.len(),
            });
            log::trace!("tty{}: transmitting {} bytes for pid {}", tty, chunk.len(), writer);
            self.hw.tty_transmit(tty, chunk);
            return;
        }
    }

    /// 发送完成陷阱
    pub(crate) fn tty_transmitted(&mut self, tty: usize) {
        let Some(terminal) = self.ttys.get_mut(tty) else {
            log::warn!("tty: transmit interrupt for unknown terminal {}", tty);
            return;
        };
        let Some(done) = terminal.in_flight.take() else {
            log::warn!("tty{}: spurious transmit interrupt", tty);
            return;
        };

        if let Some(BlockOn::TtyWrite { data, sent, .. }) = self
            .procs
            .get_mut(&done.pid)
            .and_then(|p| p.blocked_on_mut())
        {
            *sent += done.len;
            if *sent >= data.len() {
                let total = data.len();
                if terminal.writers.front() == Some(&done.pid) {
                    terminal.writers.pop_front();
                }
                self.wake(done.pid, total as i64);
            }
        }
        self.start_transmit(tty);
    }

    /// 接收陷阱：取出收到的一行，按 FIFO 服务阻塞的读者
    pub(crate) fn tty_received(&mut self, tty: usize) {
        if tty >= self.ttys.len() {
            log::warn!("tty: receive interrupt for unknown terminal {}", tty);
            return;
        }
        let mut line = vec![0u8; self.config.terminal_max_line];
        let n = self.hw.tty_receive(tty, &mut line);
        line.truncate(n);
        log::trace!("tty{}: received {} bytes", tty, n);
        if n > 0 {
            self.ttys[tty].push_line(line);
        }

        while self.ttys[tty].has_input() {
            let Some(reader) = self.ttys[tty].readers.pop_front() else {
                break;
            };
            let Some(BlockOn::TtyRead { buf, len, .. }) =
                self.procs.get(&reader).and_then(|p| p.blocked_on())
            else {
                continue;
            };
            let (buf, len) = (*buf, *len);
            let data = self.ttys[tty].take_input(len);
            let ret = match self.copy_to_user(reader, buf, &data) {
                Ok(()) => data.len() as i64,
                Err(e) => e.to_errno(),
            };
            self.wake(reader, ret);
        }
    }
}
