//! 进程号分配

use super::{INIT_PID, Pid};

/// 单调递增的进程号，不复用
///
/// 0 和 1 固定属于 idle 和 init，普通进程从 2 开始。
#[derive(Debug)]
pub struct PidAllocator {
    next: Pid,
}

impl PidAllocator {
    /// 下一个分配的进程号是 2
    pub const fn new() -> Self {
        PidAllocator { next: INIT_PID + 1 }
    }

    /// 取出下一个进程号
    ///
    /// # Panics
    /// 进程号用尽时 panic。
    pub fn allocate(&mut self) -> Pid {
        let pid = self.next;
        self.next = pid
            .checked_add(1)
            .unwrap_or_else(|| panic!("pid: space exhausted"));
        pid
    }
}

impl Default for PidAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pids_start_after_init_and_increase() {
        let mut pids = PidAllocator::new();
        assert_eq!(pids.allocate(), 2);
        assert_eq!(pids.allocate(), 3);
        assert_eq!(pids.allocate(), 4);
    }
}
