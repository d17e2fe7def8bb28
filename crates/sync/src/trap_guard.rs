//! 陷阱屏蔽

use crate::trap_control;

/// 存在期间陷阱被屏蔽，drop 时恢复成创建前的状态
///
/// 恢复的是之前的状态而不是无条件打开，所以可以嵌套。
pub struct TrapGuard {
    was_enabled: bool,
}

impl TrapGuard {
    /// 屏蔽陷阱并记住之前的状态
    pub fn new() -> Self {
        // SAFETY: drop 时把同一个值交还给 restore_traps
        let was_enabled = unsafe { trap_control().mask_traps() };
        TrapGuard { was_enabled }
    }

    /// 创建前陷阱是否开启
    pub fn was_enabled(&self) -> bool {
        self.was_enabled
    }
}

impl Default for TrapGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TrapGuard {
    fn drop(&mut self) {
        // SAFETY: was_enabled 来自 new 中的 mask_traps
        unsafe { trap_control().restore_traps(self.was_enabled) };
    }
}
