//! 程序装载器接口

use alloc::string::String;
use alloc::vec::Vec;
use thiserror::Error;

/// 装载器交给内核的程序映像
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramImage {
    /// 代码段内容，装入区域 1 起始处，读执行
    pub text: Vec<u8>,
    /// 已初始化数据，紧跟代码段之后的页，读写
    pub data: Vec<u8>,
    /// 数据之后需要清零的字节数
    pub bss_len: usize,
    /// 入口相对代码段起点的偏移
    pub entry_offset: usize,
}

/// 装载失败的原因
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// 找不到程序
    #[error("program not found")]
    NotFound,
    /// 映像格式错误
    #[error("malformed program image: {0}")]
    Malformed(String),
}

/// 程序装载器
pub trait ProgramLoader: Send {
    /// 按名字装载程序，`args` 为完整参数向量
    fn load(&mut self, name: &str, args: &[String]) -> Result<ProgramImage, LoadError>;
}
