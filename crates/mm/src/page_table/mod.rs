//! 页表模块
//!
//! 本模块提供单级定长页表：页表项的打包格式、保护位，以及页表的创建、映射、解除映射和翻译。
mod entry;
mod table;

pub use entry::*;
pub use table::*;

use thiserror::Error;

/// 分页操作中可能发生的错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PagingError {
    /// 内存耗尽
    #[error("out of physical frames")]
    OutOfMemory,
    /// 请求的地址区间非法（越出区域、与栈重叠、低于下界等）
    #[error("address range is not valid here")]
    InvalidRange,
    /// 虚拟地址未被映射
    #[error("address is not mapped")]
    NotMapped,
    /// 页已映射但保护位不允许此次访问
    #[error("access not permitted by page protection")]
    AccessDenied,
}

/// 分页操作的结果类型
pub type PagingResult<T> = Result<T, PagingError>;
