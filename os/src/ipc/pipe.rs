//! 管道模块（内核对象版）
//!
//! 基于 `VecDeque<u8>` 的有界环形缓冲区：
//! - 写入时能放多少放多少，返回实际写入字节数；
//! - 读取时取走不超过请求长度的字节；
//! - 读者只在缓冲区为空时排队，写者只在缓冲区已满时排队。

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::kernel::task::Pid;

/// 管道
#[derive(Debug)]
pub struct Pipe {
    buffer: VecDeque<u8>,
    capacity: usize,
    readers: VecDeque<Pid>,
    writers: VecDeque<Pid>,
}

impl Pipe {
    /// 创建容量为 `capacity` 字节的管道
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            readers: VecDeque::new(),
            writers: VecDeque::new(),
        }
    }

    /// 缓冲区中的字节数
    pub fn available(&self) -> usize {
        self.buffer.len()
    }

    /// 剩余空间
    pub fn space(&self) -> usize {
        self.capacity - self.buffer.len()
    }

    /// 写入尽可能多的字节，返回写入数
    pub fn write(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.space());
        self.buffer.extend(&data[..n]);
        n
    }

    /// 取出至多 `max` 字节
    pub fn read(&mut self, max: usize) -> Vec<u8> {
        let n = max.min(self.buffer.len());
        self.buffer.drain(..n).collect()
    }

    /// 阻塞的读者
    pub fn readers(&self) -> &VecDeque<Pid> {
        &self.readers
    }

    /// 阻塞的写者
    pub fn writers(&self) -> &VecDeque<Pid> {
        &self.writers
    }

    pub(crate) fn readers_mut(&mut self) -> &mut VecDeque<Pid> {
        &mut self.readers
    }

    pub(crate) fn writers_mut(&mut self) -> &mut VecDeque<Pid> {
        &mut self.writers
    }

    /// 从两个等待队列中移除进程
    pub fn remove_waiter(&mut self, pid: Pid) {
        self.readers.retain(|&p| p != pid);
        self.writers.retain(|&p| p != pid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_write() {
        let mut pipe = Pipe::new(4);
        assert_eq!(pipe.write(b"abcdef"), 4);
        assert_eq!(pipe.space(), 0);
        assert_eq!(pipe.write(b"g"), 0);
    }

    #[test]
    fn test_read_preserves_order() {
        let mut pipe = Pipe::new(8);
        pipe.write(b"hello");
        assert_eq!(pipe.read(2), b"he");
        pipe.write(b"!!");
        assert_eq!(pipe.read(10), b"llo!!");
        assert_eq!(pipe.available(), 0);
    }
}
