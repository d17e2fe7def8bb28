//! 内核错误类型
//!
//! 所有系统调用失败在用户态都表现为同一个哨兵值 [`uapi::errno::ERROR`]，
//! 内核内部保留具体原因，便于日志与测试区分。

use mm::PagingError;
use thiserror::Error;

/// 内核错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum KernelError {
    /// 物理帧耗尽
    #[error("out of memory")]
    OutOfMemory,
    /// 终端号越界
    #[error("index out of range")]
    InvalidIndex,
    /// 地址区间非法（brk 与栈重叠、低于下界等）
    #[error("invalid address range")]
    InvalidRange,
    /// 程序无法装载
    #[error("invalid program")]
    InvalidProgram,
    /// 没有子进程可等待
    #[error("no children")]
    NoChildren,
    /// 内核对象仍在使用中
    #[error("resource busy")]
    ResourceBusy,
    /// 句柄不存在或类型不符
    #[error("unknown handle")]
    UnknownHandle,
    /// 参数非法（负长度等）
    #[error("invalid argument")]
    InvalidArgument,
    /// 调用者不持有该锁
    #[error("caller does not own the lock")]
    NotOwner,
    /// 用户指针不可访问
    #[error("bad user address")]
    BadAddress,
}

impl KernelError {
    /// 转换为系统调用返回值
    pub fn to_errno(&self) -> i64 {
        uapi::errno::ERROR
    }
}

impl From<PagingError> for KernelError {
    fn from(e: PagingError) -> Self {
        match e {
            PagingError::OutOfMemory => KernelError::OutOfMemory,
            PagingError::InvalidRange => KernelError::InvalidRange,
            PagingError::NotMapped | PagingError::AccessDenied => KernelError::BadAddress,
        }
    }
}

/// 内核操作的结果类型
pub type KernelResult<T> = Result<T, KernelError>;
